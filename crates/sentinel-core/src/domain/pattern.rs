//! Pattern clusters: groups of pull requests sharing a repeated feature.

use serde::{Deserialize, Serialize};

use super::repo::RepositoryRef;

/// Which feature a [`PatternCluster`] was built from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    PathArea,
    TitleFingerprint,
    FailureSignature,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathArea => "path-area",
            Self::TitleFingerprint => "title-fingerprint",
            Self::FailureSignature => "failure-signature",
        }
    }
}

/// A reference to a clustered pull request, by identity rather than
/// object, matching the index-based adjacency the engine builds
/// internally (see `sentinel_engine::engine::cluster`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    pub repo: RepositoryRef,
    pub number: u64,
    pub priority_score: u32,
}

/// A group of `>= minClusterSize` PRs sharing a single feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatternCluster {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub key: String,
    pub size: usize,
    pub pull_requests: Vec<PullRequestRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_type_as_str() {
        assert_eq!(PatternType::PathArea.as_str(), "path-area");
        assert_eq!(PatternType::TitleFingerprint.as_str(), "title-fingerprint");
        assert_eq!(
            PatternType::FailureSignature.as_str(),
            "failure-signature"
        );
    }

    #[test]
    fn test_pattern_type_serde_is_kebab_case() {
        let json = serde_json::to_string(&PatternType::TitleFingerprint).unwrap();
        assert_eq!(json, "\"title-fingerprint\"");
    }
}
