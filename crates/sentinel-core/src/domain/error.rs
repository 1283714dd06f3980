//! Stable error taxonomy for sentinel-eye.
//!
//! Every variant's `Display` renders `E_CODE: human message`, matching
//! the wire shape `{code, message}` consumed by the HTTP surface and
//! the dashboard sections. `code()` extracts the stable machine code so
//! callers never need to re-parse `Display` output.

use serde_json::Value;

/// Stable, machine-readable error taxonomy.
///
/// Codes are grouped the way the upstream taxonomy groups them: input
/// validation, config, context resolution, provider runtime, and
/// dashboard-level errors.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    // -- input validation -------------------------------------------------
    #[error("E_SENTINEL_ARG_REQUIRED: {0}")]
    ArgRequired(String),
    #[error("E_SENTINEL_ARG_INVALID: {0}")]
    ArgInvalid(String),
    #[error("E_SENTINEL_ARG_UNKNOWN: {0}")]
    ArgUnknown(String),

    // -- config -------------------------------------------------------------
    #[error("E_SENTINEL_CONFIG_NOT_FOUND: {0}")]
    ConfigNotFound(String),
    #[error("E_SENTINEL_CONFIG_READ: {0}")]
    ConfigRead(String),
    #[error("E_SENTINEL_CONFIG_INVALID_JSON: {0}")]
    ConfigInvalidJson(String),
    #[error("E_SENTINEL_CONFIG_INVALID: {issues}", issues = .0.join("; "))]
    ConfigInvalid(Vec<String>),

    // -- context resolution ---------------------------------------------
    #[error("E_SENTINEL_REPO_RESOLVE_FAILED: {0}")]
    RepoResolveFailed(String),
    #[error("E_SENTINEL_PR_RESOLVE_FAILED: {0}")]
    PrResolveFailed(String),
    #[error("E_SENTINEL_AUTH_MISSING: {0}")]
    AuthMissing(String),
    #[error("E_PROVIDER_UNSUPPORTED: {0}")]
    ProviderUnsupported(String),
    #[error("E_SENTINEL_PROVIDER_NOT_IMPLEMENTED: {0}")]
    ProviderNotImplemented(String),

    // -- provider runtime -------------------------------------------------
    #[error("E_SENTINEL_API_ERROR: {0}")]
    ApiError(String),
    #[error("E_SENTINEL_NOTIFICATIONS_SCOPE_REQUIRED: {0}")]
    NotificationsScopeRequired(String),

    // -- dashboard ----------------------------------------------------------
    #[error("E_DASHBOARD_PENDING: {0}")]
    DashboardPending(String),
    #[error("E_DASHBOARD_UNKNOWN: {0}")]
    DashboardUnknown(String),
    #[error("E_DASHBOARD_AUTH_REQUIRED: {0}")]
    DashboardAuthRequired(String),
    #[error("E_DASHBOARD_ASSET_FORBIDDEN: {0}")]
    DashboardAssetForbidden(String),
    #[error("E_DASHBOARD_METHOD_NOT_ALLOWED: {0}")]
    DashboardMethodNotAllowed(String),
    #[error("E_DASHBOARD_PORT_IN_USE: {0}")]
    DashboardPortInUse(String),
    #[error("E_DASHBOARD_SERVER_START: {0}")]
    DashboardServerStart(String),
    #[error("E_DASHBOARD_ASSETS_MISSING: {0}")]
    DashboardAssetsMissing(String),

    #[error("E_SENTINEL_SECTION_ERROR: {0}")]
    SectionError(String),

    #[error("E_SENTINEL_SERIALIZATION: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SentinelError {
    /// The stable `E_...` machine code, without the trailing `: message`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArgRequired(_) => "E_SENTINEL_ARG_REQUIRED",
            Self::ArgInvalid(_) => "E_SENTINEL_ARG_INVALID",
            Self::ArgUnknown(_) => "E_SENTINEL_ARG_UNKNOWN",
            Self::ConfigNotFound(_) => "E_SENTINEL_CONFIG_NOT_FOUND",
            Self::ConfigRead(_) => "E_SENTINEL_CONFIG_READ",
            Self::ConfigInvalidJson(_) => "E_SENTINEL_CONFIG_INVALID_JSON",
            Self::ConfigInvalid(_) => "E_SENTINEL_CONFIG_INVALID",
            Self::RepoResolveFailed(_) => "E_SENTINEL_REPO_RESOLVE_FAILED",
            Self::PrResolveFailed(_) => "E_SENTINEL_PR_RESOLVE_FAILED",
            Self::AuthMissing(_) => "E_SENTINEL_AUTH_MISSING",
            Self::ProviderUnsupported(_) => "E_PROVIDER_UNSUPPORTED",
            Self::ProviderNotImplemented(_) => "E_SENTINEL_PROVIDER_NOT_IMPLEMENTED",
            Self::ApiError(_) => "E_SENTINEL_API_ERROR",
            Self::NotificationsScopeRequired(_) => "E_SENTINEL_NOTIFICATIONS_SCOPE_REQUIRED",
            Self::DashboardPending(_) => "E_DASHBOARD_PENDING",
            Self::DashboardUnknown(_) => "E_DASHBOARD_UNKNOWN",
            Self::DashboardAuthRequired(_) => "E_DASHBOARD_AUTH_REQUIRED",
            Self::DashboardAssetForbidden(_) => "E_DASHBOARD_ASSET_FORBIDDEN",
            Self::DashboardMethodNotAllowed(_) => "E_DASHBOARD_METHOD_NOT_ALLOWED",
            Self::DashboardPortInUse(_) => "E_DASHBOARD_PORT_IN_USE",
            Self::DashboardServerStart(_) => "E_DASHBOARD_SERVER_START",
            Self::DashboardAssetsMissing(_) => "E_DASHBOARD_ASSETS_MISSING",
            Self::SectionError(_) => "E_SENTINEL_SECTION_ERROR",
            Self::Serialization(_) => "E_SENTINEL_SERIALIZATION",
        }
    }

    /// Structured detail payload for errors that carry one. Provider
    /// adapters that want to surface a `retryAfterSeconds` /
    /// `retryAfterMs` hint attach it via [`SentinelError::ApiError`]'s
    /// message (`retry-after=N`); this accessor is the extension point
    /// for adapters that need a typed payload instead.
    pub fn details(&self) -> Option<Value> {
        None
    }
}

/// Result type for sentinel-eye domain operations.
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Extract `(code, message)` from an error's rendered text, per the
/// `^([A-Z0-9_]+):\s*(.*)$` contract used when serializing dashboard
/// section errors. Unmatched text becomes `E_DASHBOARD_UNKNOWN`.
pub fn extract_code(text: &str) -> (String, String) {
    use once_cell::sync::Lazy;
    use regex::Regex;
    static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z0-9_]+):\s*(.*)$").unwrap());

    match CODE_RE.captures(text) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => ("E_DASHBOARD_UNKNOWN".to_string(), text.to_string()),
    }
}

/// Truncate a message to `max_chars`, matching the 220-char cap the
/// snapshot builder applies before embedding errors in a section.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_string();
    }
    message.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_has_code_prefix() {
        let err = SentinelError::AuthMissing("GITHUB_TOKEN not set".to_string());
        assert_eq!(
            err.to_string(),
            "E_SENTINEL_AUTH_MISSING: GITHUB_TOKEN not set"
        );
        assert_eq!(err.code(), "E_SENTINEL_AUTH_MISSING");
    }

    #[test]
    fn test_extract_code_matches_known_prefix() {
        let (code, msg) = extract_code("E_SENTINEL_API_ERROR: rate limited, status=429");
        assert_eq!(code, "E_SENTINEL_API_ERROR");
        assert_eq!(msg, "rate limited, status=429");
    }

    #[test]
    fn test_extract_code_falls_back_to_unknown() {
        let (code, msg) = extract_code("boom, nothing structured here");
        assert_eq!(code, "E_DASHBOARD_UNKNOWN");
        assert_eq!(msg, "boom, nothing structured here");
    }

    #[test]
    fn test_truncate_message_respects_cap() {
        let long = "x".repeat(500);
        let truncated = truncate_message(&long, 220);
        assert_eq!(truncated.chars().count(), 220);
    }

    #[test]
    fn test_truncate_message_leaves_short_untouched() {
        assert_eq!(truncate_message("short", 220), "short");
    }

    #[test]
    fn test_config_invalid_joins_issues() {
        let err = SentinelError::ConfigInvalid(vec![
            "limits.maxNotifications: must be 1..500".to_string(),
            "scoring.weights: expected 5 floats".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("maxNotifications"));
        assert!(msg.contains("scoring.weights"));
    }
}
