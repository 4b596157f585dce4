//! Versioned in-memory file store
//!
//! `MemoryPfs` keeps repositories, commits and branches entirely in memory and
//! implements [`FileSource`], so it can stand in for the real versioned
//! filesystem in tests, benchmarks and embedded use.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::BuildContext;
use crate::defaults::DEFAULT_BRANCH;
use crate::error::{Error, Result};
use crate::path::{clean_path, GlobPattern};
use crate::source::FileSource;

/// Content-addressed reference to a file's bytes (SHA-256, hex encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileHandle(String);

impl FileHandle {
    /// Hash `content` into a handle
    pub fn for_content(content: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(content)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One versioned file: where it lives and what it contains
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInfo {
    /// Repository the file belongs to
    pub repo: String,
    /// Commit the file was read at
    pub commit: String,
    /// Rooted path within the commit
    pub path: String,
    /// Handle to the file's content
    pub handle: FileHandle,
    /// Size of the content in bytes
    pub size_bytes: u64,
}

impl FileInfo {
    /// Describe `content` stored at `path` in `repo@commit`
    pub fn new(repo: &str, commit: &str, path: &str, content: &[u8]) -> Self {
        Self {
            repo: repo.to_string(),
            commit: commit.to_string(),
            path: clean_path(path),
            handle: FileHandle::for_content(content),
            size_bytes: content.len() as u64,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Commit {
    files: BTreeMap<String, Arc<FileInfo>>,
    branch: String,
    finished: bool,
}

#[derive(Debug, Clone, Default)]
struct Repo {
    commits: HashMap<String, Commit>,
    branches: HashMap<String, String>,
    commit_count: u64,
}

/// In-memory versioned filesystem
#[derive(Debug, Clone, Default)]
pub struct MemoryPfs {
    repos: BTreeMap<String, Repo>,
}

impl MemoryPfs {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with no commits
    pub fn create_repo(&mut self, repo: &str) -> Result<()> {
        if self.repos.contains_key(repo) {
            return Err(Error::Source {
                message: format!("repository '{}' already exists", repo),
            });
        }
        self.repos.insert(repo.to_string(), Repo::default());
        Ok(())
    }

    /// Check if a repository exists
    pub fn has_repo(&self, repo: &str) -> bool {
        self.repos.contains_key(repo)
    }

    /// Open a new commit on `branch`, starting from the branch head's files.
    ///
    /// Returns the new commit id.
    pub fn start_commit(&mut self, repo: &str, branch: &str) -> Result<String> {
        let state = self.repo_mut(repo)?;
        state.commit_count += 1;
        let id = commit_id(repo, state.commit_count);

        let files = match state.branches.get(branch) {
            Some(head) => state.commits[head]
                .files
                .iter()
                .map(|(path, file)| {
                    let mut file = FileInfo::clone(file);
                    file.commit = id.clone();
                    (path.clone(), Arc::new(file))
                })
                .collect(),
            None => BTreeMap::new(),
        };

        state.commits.insert(
            id.clone(),
            Commit {
                files,
                branch: branch.to_string(),
                finished: false,
            },
        );
        Ok(id)
    }

    /// Add or replace a file in an open commit
    pub fn put_file(&mut self, repo: &str, commit: &str, path: &str, content: &[u8]) -> Result<()> {
        let state = self.open_commit_mut(repo, commit)?;
        let file = FileInfo::new(repo, commit, path, content);
        state.files.insert(file.path.clone(), Arc::new(file));
        Ok(())
    }

    /// Add or replace a file with string content
    pub fn put_file_string(
        &mut self,
        repo: &str,
        commit: &str,
        path: &str,
        content: &str,
    ) -> Result<()> {
        self.put_file(repo, commit, path, content.as_bytes())
    }

    /// Remove a file from an open commit
    pub fn delete_file(&mut self, repo: &str, commit: &str, path: &str) -> Result<()> {
        let state = self.open_commit_mut(repo, commit)?;
        let path = clean_path(path);
        if state.files.remove(&path).is_none() {
            return Err(Error::Source {
                message: format!("file not found: {}@{}:{}", repo, commit, path),
            });
        }
        Ok(())
    }

    /// Close a commit and make it the head of its branch
    pub fn finish_commit(&mut self, repo: &str, commit: &str) -> Result<()> {
        let state = self.repo_mut(repo)?;
        let entry = state
            .commits
            .get_mut(commit)
            .ok_or_else(|| Error::CommitNotFound {
                repo: repo.to_string(),
                commit: commit.to_string(),
            })?;
        entry.finished = true;
        let branch = entry.branch.clone();
        state.branches.insert(branch, commit.to_string());
        Ok(())
    }

    /// Latest finished commit on `branch`
    pub fn branch_head(&self, repo: &str, branch: &str) -> Result<String> {
        self.repo(repo)?
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::BranchNotFound {
                repo: repo.to_string(),
                branch: branch.to_string(),
            })
    }

    /// All files of a finished commit, sorted by path
    pub fn list_files(&self, repo: &str, commit: &str) -> Result<Vec<Arc<FileInfo>>> {
        Ok(self.finished_commit(repo, commit)?.files.values().cloned().collect())
    }

    /// Convenience for tests and demos: one finished commit on the default
    /// branch holding `files`.
    pub fn commit_files<'a, I>(&mut self, repo: &str, files: I) -> Result<String>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        if !self.has_repo(repo) {
            self.create_repo(repo)?;
        }
        let commit = self.start_commit(repo, DEFAULT_BRANCH)?;
        for (path, content) in files {
            self.put_file(repo, &commit, path, content)?;
        }
        self.finish_commit(repo, &commit)?;
        Ok(commit)
    }

    fn repo(&self, repo: &str) -> Result<&Repo> {
        self.repos.get(repo).ok_or_else(|| Error::RepoNotFound {
            repo: repo.to_string(),
        })
    }

    fn repo_mut(&mut self, repo: &str) -> Result<&mut Repo> {
        self.repos.get_mut(repo).ok_or_else(|| Error::RepoNotFound {
            repo: repo.to_string(),
        })
    }

    fn finished_commit(&self, repo: &str, commit: &str) -> Result<&Commit> {
        let entry = self
            .repo(repo)?
            .commits
            .get(commit)
            .ok_or_else(|| Error::CommitNotFound {
                repo: repo.to_string(),
                commit: commit.to_string(),
            })?;
        if !entry.finished {
            return Err(Error::CommitNotFinished {
                repo: repo.to_string(),
                commit: commit.to_string(),
            });
        }
        Ok(entry)
    }

    fn open_commit_mut(&mut self, repo: &str, commit: &str) -> Result<&mut Commit> {
        let entry = self
            .repo_mut(repo)?
            .commits
            .get_mut(commit)
            .ok_or_else(|| Error::CommitNotFound {
                repo: repo.to_string(),
                commit: commit.to_string(),
            })?;
        if entry.finished {
            return Err(Error::Source {
                message: format!("commit {}@{} is already finished", repo, commit),
            });
        }
        Ok(entry)
    }
}

impl FileSource for MemoryPfs {
    fn glob_files(
        &self,
        ctx: &BuildContext,
        repo: &str,
        commit: &str,
        pattern: &GlobPattern,
    ) -> Result<Vec<Arc<FileInfo>>> {
        ctx.check()?;
        Ok(self
            .finished_commit(repo, commit)?
            .files
            .iter()
            .filter(|(path, _)| pattern.matches(path))
            .map(|(_, file)| Arc::clone(file))
            .collect())
    }

    fn resolve_branch(&self, ctx: &BuildContext, repo: &str, branch: &str) -> Result<String> {
        ctx.check()?;
        self.branch_head(repo, branch)
    }
}

fn commit_id(repo: &str, sequence: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo.as_bytes());
    hasher.update(sequence.to_be_bytes());
    hex::encode(&hasher.finalize()[..16])
}
