//! # File Source Boundary
//!
//! The versioned filesystem is an external collaborator. This module defines
//! the narrow interface the builder consumes from it, so that the real
//! service, the in-memory [`MemoryPfs`](crate::filesystem::MemoryPfs) and
//! test doubles are interchangeable.
//!
//! ## Contract
//!
//! - `glob_files` returns every file of `repo@commit` selected by `pattern`,
//!   sorted ascending by path. An empty result is valid.
//! - `resolve_branch` returns the head commit of a branch.
//! - Both receive the caller's [`BuildContext`] and should give up with
//!   `Error::Cancelled` / `Error::DeadlineExceeded` when it says so.
//! - Any other failure is reported as an upstream error and is propagated
//!   unchanged by the builder.

use std::sync::Arc;

use crate::context::BuildContext;
use crate::error::Result;
use crate::filesystem::FileInfo;
use crate::path::GlobPattern;

/// Trait for file listing - allows swapping the backing store
pub trait FileSource: Send + Sync {
    /// List the files of `repo@commit` matching `pattern`, sorted by path.
    fn glob_files(
        &self,
        ctx: &BuildContext,
        repo: &str,
        commit: &str,
        pattern: &GlobPattern,
    ) -> Result<Vec<Arc<FileInfo>>>;

    /// Resolve the head commit of `branch` in `repo`.
    fn resolve_branch(&self, ctx: &BuildContext, repo: &str, branch: &str) -> Result<String>;
}

impl<S: FileSource + ?Sized> FileSource for &S {
    fn glob_files(
        &self,
        ctx: &BuildContext,
        repo: &str,
        commit: &str,
        pattern: &GlobPattern,
    ) -> Result<Vec<Arc<FileInfo>>> {
        (**self).glob_files(ctx, repo, commit, pattern)
    }

    fn resolve_branch(&self, ctx: &BuildContext, repo: &str, branch: &str) -> Result<String> {
        (**self).resolve_branch(ctx, repo, branch)
    }
}

impl<S: FileSource + ?Sized> FileSource for Arc<S> {
    fn glob_files(
        &self,
        ctx: &BuildContext,
        repo: &str,
        commit: &str,
        pattern: &GlobPattern,
    ) -> Result<Vec<Arc<FileInfo>>> {
        (**self).glob_files(ctx, repo, commit, pattern)
    }

    fn resolve_branch(&self, ctx: &BuildContext, repo: &str, branch: &str) -> Result<String> {
        (**self).resolve_branch(ctx, repo, branch)
    }
}
