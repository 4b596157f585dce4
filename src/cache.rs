//! In-process caching of glob results

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::trace;

use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::filesystem::FileInfo;
use crate::path::GlobPattern;
use crate::source::FileSource;

/// Cache key combining repository, commit and pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub repo: String,
    pub commit: String,
    pub pattern: String,
}

impl MatchKey {
    pub fn new(repo: &str, commit: &str, pattern: &str) -> Self {
        Self {
            repo: repo.to_string(),
            commit: commit.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

/// A `FileSource` wrapper that lists each (repo, commit, pattern) once.
///
/// Commits are immutable, so a cached listing never goes stale. Branch
/// resolution is not cached since branch heads move.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    cache: Mutex<HashMap<MatchKey, Arc<[Arc<FileInfo>]>>>,
}

impl<S: FileSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped source
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get the number of cached listings
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Check if nothing has been cached yet
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Clear all cached listings
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<MatchKey, Arc<[Arc<FileInfo>]>>>> {
        self.cache.lock().map_err(|_| Error::LockPoisoned {
            context: "glob cache".to_string(),
        })
    }
}

impl<S: FileSource> FileSource for CachedSource<S> {
    fn glob_files(
        &self,
        ctx: &BuildContext,
        repo: &str,
        commit: &str,
        pattern: &GlobPattern,
    ) -> Result<Vec<Arc<FileInfo>>> {
        let key = MatchKey::new(repo, commit, pattern.as_str());

        // First check if we have a cached result
        if let Some(cached) = self.lock()?.get(&key) {
            trace!("glob cache hit for {}@{} '{}'", repo, commit, pattern);
            return Ok(cached.to_vec());
        }

        // Not in cache; list without holding the lock
        let files = self.inner.glob_files(ctx, repo, commit, pattern)?;
        self.lock()?.insert(key, files.as_slice().into());
        Ok(files)
    }

    fn resolve_branch(&self, ctx: &BuildContext, repo: &str, branch: &str) -> Result<String> {
        self.inner.resolve_branch(ctx, repo, branch)
    }
}
