//! Commit snapshots: which commit each repository is read at
//!
//! Datums must be computed against one consistent view of the inputs. A
//! `CommitSnapshot` pins a commit per repository; a `pfs` input that names its
//! own commit overrides the snapshot.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{Input, PfsInput};
use crate::context::BuildContext;
use crate::defaults::branch_or_default;
use crate::error::{Error, Result};
use crate::source::FileSource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSnapshot {
    commits: BTreeMap<String, String>,
}

impl CommitSnapshot {
    /// An empty snapshot; every input must then name its commit
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commit(mut self, repo: &str, commit: &str) -> Self {
        self.insert(repo, commit);
        self
    }

    /// Pin `repo` to `commit`, returning the previous pin
    pub fn insert(&mut self, repo: &str, commit: &str) -> Option<String> {
        self.commits.insert(repo.to_string(), commit.to_string())
    }

    pub fn get(&self, repo: &str) -> Option<&str> {
        self.commits.get(repo).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Pin the branch head of every repository `input` reads without an
    /// explicit commit.
    ///
    /// A repository read from two different branches cannot be pinned to a
    /// single commit and is rejected.
    pub fn resolve(input: &Input, source: &dyn FileSource, ctx: &BuildContext) -> Result<Self> {
        let mut branches: BTreeMap<&str, &str> = BTreeMap::new();
        for pfs in input.pfs_inputs() {
            if pfs.commit.is_some() {
                continue;
            }
            let branch = branch_or_default(pfs.branch.as_deref());
            match branches.insert(&pfs.repo, branch) {
                Some(previous) if previous != branch => {
                    return Err(Error::config_with_hint(
                        format!(
                            "repo '{}' is read from branches '{}' and '{}'",
                            pfs.repo, previous, branch
                        ),
                        "pin one of the inputs to an explicit commit",
                    ));
                }
                _ => {}
            }
        }

        let mut snapshot = Self::new();
        for (repo, branch) in branches {
            ctx.check()?;
            let commit = source.resolve_branch(ctx, repo, branch)?;
            debug!("pinned {}@{} to commit {}", repo, branch, commit);
            snapshot.insert(repo, &commit);
        }
        Ok(snapshot)
    }

    /// The commit `pfs` reads: its own, else the snapshot's pin for its repo.
    pub fn commit_for<'a>(&'a self, pfs: &'a PfsInput) -> Result<&'a str> {
        if let Some(commit) = pfs.commit.as_deref() {
            return Ok(commit);
        }
        self.get(&pfs.repo).ok_or_else(|| {
            Error::config_with_hint(
                format!("no commit for repo '{}' in input '{}'", pfs.repo, pfs.name()),
                "set `commit` on the input or resolve the snapshot from branch heads",
            )
        })
    }
}
