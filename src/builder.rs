//! # Iterator Tree Builder
//!
//! Turns an [`Input`] specification into a composed [`DatumIterator`].
//!
//! ## Process
//!
//! 1.  **Validation**: the whole specification is checked with
//!     [`config::validate`] and every leaf's commit is looked up in the
//!     [`CommitSnapshot`] before the file source is contacted, so a
//!     misconfigured input never costs a listing.
//! 2.  **Resolution**: the tree is walked top-down. `pfs` leaves are listed
//!     through the [`FileSource`]; `union` and `cross` build their children
//!     and wrap them; `join` keys the listing of each of its `pfs` children.
//!     Sibling inputs share no state, so with [`BuildOptions::parallel`] they
//!     are resolved concurrently on the rayon pool.
//! 3.  **Composition**: iterators are assembled bottom-up. The first error
//!     from any child, whether a configuration error, an upstream failure or
//!     a cancellation, aborts the whole build.

use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use crate::config::{self, Input, PfsInput};
use crate::context::BuildContext;
use crate::error::Result;
use crate::filesystem::FileInfo;
use crate::iterator::{
    CrossIterator, DatumIterator, JoinIterator, KeyedFiles, PfsIterator, UnionIterator,
};
use crate::path::GlobPattern;
use crate::snapshot::CommitSnapshot;
use crate::source::FileSource;

/// Options controlling how a tree is built
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Resolve sibling inputs concurrently.
    pub parallel: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Build the iterator for `input` at `snapshot`.
pub fn build(
    input: &Input,
    snapshot: &CommitSnapshot,
    source: &dyn FileSource,
) -> Result<Box<dyn DatumIterator>> {
    build_with(
        input,
        snapshot,
        source,
        &BuildContext::new(),
        &BuildOptions::default(),
    )
}

/// Build the iterator for `input` at the current head of every branch it
/// reads.
pub fn build_latest(input: &Input, source: &dyn FileSource) -> Result<Box<dyn DatumIterator>> {
    let ctx = BuildContext::new();
    config::validate(input)?;
    let snapshot = CommitSnapshot::resolve(input, source, &ctx)?;
    build_with(input, &snapshot, source, &ctx, &BuildOptions::default())
}

/// Build the iterator for `input` at `snapshot`, honouring `ctx` for
/// cancellation and deadlines.
pub fn build_with(
    input: &Input,
    snapshot: &CommitSnapshot,
    source: &dyn FileSource,
    ctx: &BuildContext,
    options: &BuildOptions,
) -> Result<Box<dyn DatumIterator>> {
    config::validate(input)?;
    for pfs in input.pfs_inputs() {
        snapshot.commit_for(pfs)?;
    }

    let builder = Builder {
        snapshot,
        source,
        ctx,
        options,
    };
    let iter = builder.build_input(input)?;
    debug!(
        "built {} input over {} leaves: {} datums",
        input.kind(),
        input.pfs_inputs().len(),
        iter.len()
    );
    Ok(iter)
}

struct Builder<'a> {
    snapshot: &'a CommitSnapshot,
    source: &'a dyn FileSource,
    ctx: &'a BuildContext,
    options: &'a BuildOptions,
}

impl Builder<'_> {
    fn build_input(&self, input: &Input) -> Result<Box<dyn DatumIterator>> {
        self.ctx.check()?;
        let iter: Box<dyn DatumIterator> = match input {
            Input::Pfs { pfs } => {
                let pattern = GlobPattern::new(&pfs.glob)?;
                Box::new(PfsIterator::new(self.glob(pfs, &pattern)?))
            }
            Input::Union { union } => {
                let children = self.map_children(union, |child| self.build_input(child))?;
                Box::new(UnionIterator::new(children)?)
            }
            Input::Cross { cross } => {
                let children = self.map_children(cross, |child| self.build_input(child))?;
                Box::new(CrossIterator::new(children)?)
            }
            Input::Join { join } => {
                let keyed = self.map_children(join, |child| self.key_files(child))?;
                Box::new(JoinIterator::new(keyed)?)
            }
        };
        if let Input::Union { union: children }
        | Input::Cross { cross: children }
        | Input::Join { join: children } = input
        {
            debug!(
                "{} of {} inputs resolved to {} datums",
                input.kind(),
                children.len(),
                iter.len()
            );
        }
        Ok(iter)
    }

    fn key_files(&self, input: &Input) -> Result<KeyedFiles> {
        let (pfs, pattern, template) = config::join_key(input)?;
        let files = self.glob(pfs, &pattern)?;
        KeyedFiles::new(pfs.name(), &pattern, &template, files)
    }

    fn glob(&self, pfs: &PfsInput, pattern: &GlobPattern) -> Result<Vec<Arc<FileInfo>>> {
        self.ctx.check()?;
        let commit = self.snapshot.commit_for(pfs)?;
        let files = self
            .source
            .glob_files(self.ctx, &pfs.repo, commit, pattern)?;
        debug!(
            "glob '{}' on {}@{} matched {} files",
            pattern,
            pfs.repo,
            commit,
            files.len()
        );
        Ok(files)
    }

    fn map_children<T, F>(&self, children: &[Input], f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&Input) -> Result<T> + Send + Sync,
    {
        if self.options.parallel && children.len() > 1 {
            children.par_iter().map(f).collect()
        } else {
            children.iter().map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::filesystem::MemoryPfs;
    use crate::iterator::concat_paths;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> (MemoryPfs, String) {
        let mut fs = MemoryPfs::new();
        let commit = fs
            .commit_files(
                "data",
                [
                    ("a1", &b"1"[..]),
                    ("a2", &b"2"[..]),
                    ("b1", &b"3"[..]),
                    ("b2", &b"4"[..]),
                ],
            )
            .unwrap();
        (fs, commit)
    }

    fn paths(iter: &mut dyn DatumIterator) -> Vec<String> {
        let mut out = Vec::new();
        while iter.next() {
            out.push(concat_paths(&iter.datum()));
        }
        out
    }

    #[test]
    fn test_build_pfs() {
        let (fs, commit) = store();
        let snapshot = CommitSnapshot::new().with_commit("data", &commit);
        let mut iter = build(&Input::pfs("data", "/a*"), &snapshot, &fs).unwrap();
        assert_eq!(paths(iter.as_mut()), vec!["/a1", "/a2"]);
    }

    #[test]
    fn test_build_nested_sequential_and_parallel_agree() {
        let (fs, commit) = store();
        let snapshot = CommitSnapshot::new().with_commit("data", &commit);
        let input = Input::cross(vec![
            Input::union(vec![Input::pfs("data", "/a*"), Input::pfs("data", "/b1")]),
            Input::join(vec![
                PfsInput::new("data", "/a(?)").with_join_on("$1").into(),
                PfsInput::new("data", "/b(?)").with_join_on("$1").into(),
            ]),
        ]);

        let mut parallel = build(&input, &snapshot, &fs).unwrap();
        let mut sequential = build_with(
            &input,
            &snapshot,
            &fs,
            &BuildContext::new(),
            &BuildOptions { parallel: false },
        )
        .unwrap();

        assert_eq!(parallel.len(), 6);
        let expected = vec![
            "/a1/a1/b1",
            "/a2/a1/b1",
            "/b1/a1/b1",
            "/a1/a2/b2",
            "/a2/a2/b2",
            "/b1/a2/b2",
        ];
        assert_eq!(paths(parallel.as_mut()), expected);
        assert_eq!(paths(sequential.as_mut()), expected);
    }

    #[test]
    fn test_build_latest_uses_branch_heads() {
        let (fs, _) = store();
        let iter = build_latest(&Input::pfs("data", "/*"), &fs).unwrap();
        assert_eq!(iter.len(), 4);
    }

    #[test]
    fn test_missing_commit_fails_before_listing() {
        struct Unreachable;
        impl FileSource for Unreachable {
            fn glob_files(
                &self,
                _ctx: &BuildContext,
                _repo: &str,
                _commit: &str,
                _pattern: &GlobPattern,
            ) -> Result<Vec<Arc<FileInfo>>> {
                panic!("file source must not be contacted");
            }
            fn resolve_branch(&self, _: &BuildContext, _: &str, _: &str) -> Result<String> {
                panic!("file source must not be contacted");
            }
        }

        let snapshot = CommitSnapshot::new().with_commit("data", "c1");
        let input = Input::cross(vec![Input::pfs("data", "/*"), Input::pfs("other", "/*")]);
        let err = build(&input, &snapshot, &Unreachable).unwrap_err();
        assert!(err.is_configuration());

        let bad_join = Input::join(vec![Input::pfs("data", "/*"), Input::pfs("data", "/*")]);
        let err = build(&bad_join, &snapshot, &Unreachable).unwrap_err();
        assert!(err.to_string().contains("no join_on template"));
    }

    #[test]
    fn test_upstream_error_is_propagated_unchanged() {
        let (fs, _) = store();
        let snapshot = CommitSnapshot::new().with_commit("data", "does-not-exist");
        let err = build(&Input::pfs("data", "/*"), &snapshot, &fs).unwrap_err();
        match err {
            Error::CommitNotFound { repo, commit } => {
                assert_eq!(repo, "data");
                assert_eq!(commit, "does-not-exist");
            }
            other => panic!("expected CommitNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_build_fails_wholesale() {
        let (fs, commit) = store();
        let snapshot = CommitSnapshot::new().with_commit("data", &commit);
        let ctx = BuildContext::new();
        ctx.cancel();
        let input = Input::union(vec![Input::pfs("data", "/a*"), Input::pfs("data", "/b*")]);
        let err = build_with(&input, &snapshot, &fs, &ctx, &BuildOptions::default()).unwrap_err();
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_cancellation_mid_build() {
        /// Cancels the shared context after the first listing
        struct CancelAfterFirst {
            inner: MemoryPfs,
            calls: AtomicUsize,
        }
        impl FileSource for CancelAfterFirst {
            fn glob_files(
                &self,
                ctx: &BuildContext,
                repo: &str,
                commit: &str,
                pattern: &GlobPattern,
            ) -> Result<Vec<Arc<FileInfo>>> {
                let files = self.inner.glob_files(ctx, repo, commit, pattern)?;
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    ctx.cancel();
                }
                Ok(files)
            }
            fn resolve_branch(
                &self,
                ctx: &BuildContext,
                repo: &str,
                branch: &str,
            ) -> Result<String> {
                self.inner.resolve_branch(ctx, repo, branch)
            }
        }

        let (fs, commit) = store();
        let source = CancelAfterFirst {
            inner: fs,
            calls: AtomicUsize::new(0),
        };
        let snapshot = CommitSnapshot::new().with_commit("data", &commit);
        let input = Input::cross(vec![Input::pfs("data", "/a*"), Input::pfs("data", "/b*")]);
        let err = build_with(
            &input,
            &snapshot,
            &source,
            &BuildContext::new(),
            &BuildOptions { parallel: false },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_join_duplicate_key_is_configuration_error() {
        let (fs, commit) = store();
        let snapshot = CommitSnapshot::new().with_commit("data", &commit);
        let input = Input::join(vec![
            PfsInput::new("data", "/(?)*").with_join_on("$1").into(),
            PfsInput::new("data", "/(?)1").with_join_on("$1").into(),
        ]);
        let err = build(&input, &snapshot, &fs).unwrap_err();
        assert!(matches!(err, Error::DuplicateJoinKey { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_logs_glob_resolution() {
        testing_logger::setup();
        let (fs, commit) = store();
        let snapshot = CommitSnapshot::new().with_commit("data", &commit);
        build_with(
            &Input::pfs("data", "/a*"),
            &snapshot,
            &fs,
            &BuildContext::new(),
            &BuildOptions { parallel: false },
        )
        .unwrap();

        testing_logger::validate(|captured_logs| {
            assert!(captured_logs.iter().any(|log| {
                log.body.contains("glob '/a*' on data@") && log.body.contains("matched 2 files")
            }));
        });
    }
}
