//! Repository identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity for every lookup: `(owner, repo)`, both non-empty.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub repo: String,
}

impl RepositoryRef {
    /// Build a `RepositoryRef`, rejecting empty owner/repo.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, String> {
        let owner = owner.into();
        let repo = repo.into();
        if owner.is_empty() {
            return Err("owner must not be empty".to_string());
        }
        if repo.is_empty() {
            return Err("repo must not be empty".to_string());
        }
        Ok(Self { owner, repo })
    }

    /// Parse `"owner/repo"`.
    pub fn parse(slug: &str) -> Result<Self, String> {
        let (owner, repo) = slug
            .split_once('/')
            .ok_or_else(|| format!("expected \"owner/repo\", got {slug:?}"))?;
        Self::new(owner, repo)
    }

    /// Canonical `"owner/repo"` form used as the sort key in §4.3.6.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Identity key for a PR within this repo: `"owner/repo#number"`.
    pub fn pr_key(&self, number: u64) -> String {
        format!("{}/{}#{}", self.owner, self.repo, number)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_owner() {
        assert!(RepositoryRef::new("", "repo").is_err());
    }

    #[test]
    fn test_new_rejects_empty_repo() {
        assert!(RepositoryRef::new("owner", "").is_err());
    }

    #[test]
    fn test_parse_splits_on_slash() {
        let r = RepositoryRef::parse("octocat/hello-world").expect("parse");
        assert_eq!(r.owner, "octocat");
        assert_eq!(r.repo, "hello-world");
    }

    #[test]
    fn test_parse_rejects_missing_slash() {
        assert!(RepositoryRef::parse("octocat").is_err());
    }

    #[test]
    fn test_slug_and_pr_key() {
        let r = RepositoryRef::new("a", "r").unwrap();
        assert_eq!(r.slug(), "a/r");
        assert_eq!(r.pr_key(42), "a/r#42");
    }

    #[test]
    fn test_ordering_is_by_owner_then_repo() {
        let a = RepositoryRef::new("a", "z").unwrap();
        let b = RepositoryRef::new("b", "a").unwrap();
        assert!(a < b);
    }
}
