//! `DashboardSection<T>`: the tagged `ok`/`error` union every report
//! rides inside, serialized to match the wire shape exactly rather
//! than via a class hierarchy (see `multi_repo::health::CIHealthView`
//! in the lineage this pattern is drawn from: per-unit status
//! consolidated into one view without losing per-unit detail).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{extract_code, truncate_message, SentinelError};

/// `{code, message, remediation?, details?}`, the shape every error
/// response (HTTP or section) uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

const MAX_MESSAGE_CHARS: usize = 220;

impl ErrorPayload {
    /// Build a payload from an error's rendered `E_CODE: message` text.
    pub fn from_display(text: &str) -> Self {
        let (code, message) = extract_code(text);
        Self {
            code,
            message: truncate_message(&message, MAX_MESSAGE_CHARS),
            remediation: None,
            details: None,
        }
    }

    pub fn from_error(err: &SentinelError) -> Self {
        Self::from_display(&err.to_string())
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_retryable(&self) -> bool {
        const RETRYABLE_CODES: &[&str] = &[
            "E_SENTINEL_API_ERROR",
            "E_SENTINEL_AUTH_MISSING",
            "E_SENTINEL_NOTIFICATIONS_SCOPE_REQUIRED",
            "E_DASHBOARD_AUTH_REQUIRED",
        ];
        if RETRYABLE_CODES.contains(&self.code.as_str()) {
            return true;
        }
        if self.code == "E_PROVIDER_UNSUPPORTED" {
            return false;
        }
        let lower = self.message.to_ascii_lowercase();
        lower.contains("status=429") || lower.contains("timed out")
    }

    /// `retryAfterSeconds` / `retryAfterMs` from `details`, or a
    /// `retry-after=N` / `retry after N` match in the message.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        if let Some(details) = &self.details {
            if let Some(secs) = details.get("retryAfterSeconds").and_then(Value::as_u64) {
                return Some(secs);
            }
            if let Some(ms) = details.get("retryAfterMs").and_then(Value::as_u64) {
                return Some(ms.div_ceil(1000));
            }
        }
        use once_cell::sync::Lazy;
        use regex::Regex;
        static RETRY_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"(?i)retry-?after(?:=|\s+)(\d+)").unwrap());
        RETRY_RE
            .captures(&self.message)
            .and_then(|c| c[1].parse::<u64>().ok())
    }
}

/// Tagged union over `ok | error`. Serializes to exactly
/// `{status: "ok", data: T}` or `{status: "error", error: ErrorPayload}`
/// — `data`/`error` are mutually exclusive on the wire, matching
/// a "data: none"/"error: none" framing via `skip_serializing_if`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DashboardSection<T> {
    Ok { data: T },
    Error { error: ErrorPayload },
}

impl<T> DashboardSection<T> {
    pub fn ok(data: T) -> Self {
        Self::Ok { data }
    }

    pub fn err(error: ErrorPayload) -> Self {
        Self::Error { error }
    }

    pub fn from_result(result: Result<T, SentinelError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(ErrorPayload::from_error(&e)),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn error(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Ok { .. } => None,
            Self::Error { error } => Some(error),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ok { data } => Some(data),
            Self::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload_extracts_code_and_truncates() {
        let long_message = "m".repeat(500);
        let text = format!("E_SENTINEL_API_ERROR: {long_message}");
        let payload = ErrorPayload::from_display(&text);
        assert_eq!(payload.code, "E_SENTINEL_API_ERROR");
        assert_eq!(payload.message.chars().count(), 220);
    }

    #[test]
    fn test_unmatched_text_becomes_unknown_code() {
        let payload = ErrorPayload::from_display("total nonsense");
        assert_eq!(payload.code, "E_DASHBOARD_UNKNOWN");
    }

    #[test]
    fn test_retryable_codes() {
        let retryable = ErrorPayload {
            code: "E_SENTINEL_API_ERROR".to_string(),
            message: "boom".to_string(),
            remediation: None,
            details: None,
        };
        assert!(retryable.is_retryable());

        let not_retryable = ErrorPayload {
            code: "E_PROVIDER_UNSUPPORTED".to_string(),
            message: "status=429 in message but code wins".to_string(),
            remediation: None,
            details: None,
        };
        assert!(!not_retryable.is_retryable());
    }

    #[test]
    fn test_retryable_by_message_pattern() {
        let payload = ErrorPayload {
            code: "E_DASHBOARD_UNKNOWN".to_string(),
            message: "request timed out after 30s".to_string(),
            remediation: None,
            details: None,
        };
        assert!(payload.is_retryable());

        let payload2 = ErrorPayload {
            code: "E_DASHBOARD_UNKNOWN".to_string(),
            message: "server replied status=429 too many requests".to_string(),
            remediation: None,
            details: None,
        };
        assert!(payload2.is_retryable());
    }

    #[test]
    fn test_retry_after_from_details_seconds() {
        let payload = ErrorPayload {
            code: "E_SENTINEL_API_ERROR".to_string(),
            message: "rate limited".to_string(),
            remediation: None,
            details: Some(serde_json::json!({"retryAfterSeconds": 42})),
        };
        assert_eq!(payload.retry_after_seconds(), Some(42));
    }

    #[test]
    fn test_retry_after_from_details_ms_rounds_up() {
        let payload = ErrorPayload {
            code: "E_SENTINEL_API_ERROR".to_string(),
            message: "rate limited".to_string(),
            remediation: None,
            details: Some(serde_json::json!({"retryAfterMs": 1500})),
        };
        assert_eq!(payload.retry_after_seconds(), Some(2));
    }

    #[test]
    fn test_retry_after_from_message_pattern() {
        let payload = ErrorPayload {
            code: "E_SENTINEL_API_ERROR".to_string(),
            message: "rate limited, retry-after=30".to_string(),
            remediation: None,
            details: None,
        };
        assert_eq!(payload.retry_after_seconds(), Some(30));
    }

    #[test]
    fn test_section_serializes_as_tagged_union() {
        let section: DashboardSection<u32> = DashboardSection::ok(5);
        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"], 5);
        assert!(json.get("error").is_none());

        let err_section: DashboardSection<u32> =
            DashboardSection::err(ErrorPayload::from_display("E_SENTINEL_API_ERROR: boom"));
        let json = serde_json::to_value(&err_section).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code"], "E_SENTINEL_API_ERROR");
        assert!(json.get("data").is_none());
    }
}
