//! # Datum Resolver
//!
//! This library turns a pipeline's input specification into the sequence of
//! datums the pipeline processes. A datum is an ordered group of files; each
//! one is an independent unit of work.
//!
//! ## Quick Example
//!
//! ```
//! use datum_resolver::filesystem::MemoryPfs;
//! use datum_resolver::iterator::concat_paths;
//! use datum_resolver::{build, config, CommitSnapshot, DatumIterator};
//!
//! let mut fs = MemoryPfs::new();
//! let commit = fs
//!     .commit_files("images", [("/a.png", &b"a"[..]), ("/b.png", &b"b"[..])])
//!     .unwrap();
//!
//! let input = config::parse_yaml(
//!     r#"
//! pfs:
//!   repo: images
//!   glob: /*.png
//! "#,
//! )
//! .unwrap();
//!
//! let snapshot = CommitSnapshot::new().with_commit("images", &commit);
//! let mut datums = build(&input, &snapshot, &fs).unwrap();
//! assert_eq!(datums.len(), 2);
//! assert!(datums.next());
//! assert_eq!(concat_paths(&datums.datum()), "/a.png");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the recursive input specification, `pfs`
//!   leaves combined by `union`, `cross` and `join`, parsed from YAML or JSON.
//! - **Paths (`path`)**: glob patterns with capture groups, and the key
//!   templates a join uses to turn captured groups into keys.
//! - **Iterators (`iterator`)**: one datum iterator per input kind, each
//!   supporting sequential iteration and random access by index.
//! - **File sources (`source`, `filesystem`, `cache`)**: the glob query the
//!   resolver needs from the versioned file system, an in-memory store that
//!   implements it, and a memoizing wrapper.
//! - **Snapshots (`snapshot`)**: the commit every repository is read at.
//!
//! ## Execution Flow
//!
//! [`build`] validates the specification, lists each leaf's files at its
//! pinned commit and composes the iterators bottom-up. Sibling inputs are
//! resolved in parallel. Cancellation through a [`BuildContext`] aborts the
//! whole build.

pub mod builder;
pub mod cache;
pub mod config;
pub mod context;
pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod iterator;
pub mod path;
pub mod snapshot;
pub mod source;

pub use builder::{build, build_latest, build_with, BuildOptions};
pub use config::{Input, PfsInput};
pub use context::BuildContext;
pub use error::{Error, Result};
pub use iterator::{Datum, DatumIterator};
pub use snapshot::CommitSnapshot;
pub use source::FileSource;

#[cfg(test)]
mod path_proptest;
