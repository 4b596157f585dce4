//! # Error Handling
//!
//! This module defines the centralized error type for datum resolution. It
//! uses the `thiserror` library to build a single `Error` enum that covers
//! every failure the builder can surface, with enough context to tell a
//! pipeline author what to fix.
//!
//! ## Taxonomy
//!
//! Errors fall into three groups, queryable through helper methods:
//!
//! - **Configuration errors** (`Error::is_configuration`): the input
//!   specification is malformed. These are fatal and must not be retried.
//! - **Upstream errors** (`Error::is_upstream`): the file source failed or
//!   does not know the requested repository, branch or commit. They are
//!   propagated unchanged; retry policy belongs to the caller.
//! - **Cancellation** (`Error::is_cancellation`): the build was cancelled or
//!   ran past its deadline.
//!
//! Contract violations on an already-built iterator (out-of-range
//! `datum_n`, `datum()` before `next()`) are not represented here. They panic.

use thiserror::Error;

/// Main error type for datum resolution
#[derive(Error, Debug)]
pub enum Error {
    /// The input specification is structurally invalid.
    ///
    /// Includes an optional hint about how to fix it.
    #[error(
        "Configuration error: {message}{}",
        hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default()
    )]
    Config {
        message: String,
        /// Optional hint for how to fix the input specification
        hint: Option<String>,
    },

    /// A glob pattern could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// A pattern was asserted to match a path but does not.
    #[error("Pattern '{pattern}' does not match path '{path}'")]
    PatternMismatch { pattern: String, path: String },

    /// A join key template is malformed or references a missing group.
    #[error("Join key template error: '{template}' - {message}")]
    KeyTemplate { template: String, message: String },

    /// Two files of the same join input produced the same key.
    #[error("Duplicate join key '{key}' in input '{input}': {first} and {second}")]
    DuplicateJoinKey {
        input: String,
        key: String,
        first: String,
        second: String,
    },

    /// The file source does not know the repository.
    #[error("Repository not found: {repo}")]
    RepoNotFound { repo: String },

    /// The file source does not know the branch.
    #[error("Branch not found: {repo}@{branch}")]
    BranchNotFound { repo: String, branch: String },

    /// The file source does not know the commit.
    #[error("Commit not found: {repo}@{commit}")]
    CommitNotFound { repo: String, commit: String },

    /// The commit exists but is still open for writes.
    #[error("Commit not finished: {repo}@{commit}")]
    CommitNotFinished { repo: String, commit: String },

    /// Any other failure reported by the file source.
    #[error("File source error: {message}")]
    Source { message: String },

    /// The build was cancelled through its `BuildContext`.
    #[error("Build cancelled")]
    Cancelled,

    /// The build ran past the deadline of its `BuildContext`.
    #[error("Build deadline exceeded")]
    DeadlineExceeded,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

impl Error {
    /// Shorthand for a `Config` error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for a `Config` error with a hint.
    pub fn config_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Whether the error stems from a malformed input specification.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::Pattern { .. }
                | Error::PatternMismatch { .. }
                | Error::KeyTemplate { .. }
                | Error::DuplicateJoinKey { .. }
                | Error::Yaml(_)
                | Error::Json(_)
        )
    }

    /// Whether the error was reported by the file source.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::RepoNotFound { .. }
                | Error::BranchNotFound { .. }
                | Error::CommitNotFound { .. }
                | Error::CommitNotFinished { .. }
                | Error::Source { .. }
                | Error::Io(_)
                | Error::LockPoisoned { .. }
        )
    }

    /// Whether the build was cancelled or timed out.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
