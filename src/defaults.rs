//! Default values for input specifications.
//!
//! This module provides centralized default values used across the builder,
//! the snapshot resolver and the in-memory store.

/// Branch read by a `pfs` input that names neither a branch nor a commit.
pub const DEFAULT_BRANCH: &str = "master";

/// Root of every repository; all paths are rooted here.
pub const ROOT_PATH: &str = "/";

/// Returns the branch a `pfs` input reads from.
pub fn branch_or_default(branch: Option<&str>) -> &str {
    match branch {
        Some(branch) if !branch.is_empty() => branch,
        _ => DEFAULT_BRANCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_or_default() {
        assert_eq!(branch_or_default(None), "master");
        assert_eq!(branch_or_default(Some("")), "master");
        assert_eq!(branch_or_default(Some("staging")), "staging");
    }
}
