//! Session-failure detection.
//!
//! The backend reports an expired or unknown session as an HTTP 500 whose
//! body either carries `"session_id": null` or an `error_message` mentioning
//! the session. Only that combination is worth a retry with a fresh token.

use reqwest::StatusCode;
use serde_json::Value;

/// Status the backend uses for internal failures, including session ones.
pub const SESSION_FAILURE_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// State of the `session_id` field in an error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdField {
    Absent,
    Null,
    Present(String),
}

/// The parts of an error body relevant to session detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub session_id: SessionIdField,
    pub error_message: Option<String>,
}

impl ErrorResponse {
    /// Extract the session fields from a decoded body. Non-object bodies
    /// yield an empty response.
    pub fn from_body(body: &Value) -> Self {
        let Some(object) = body.as_object() else {
            return Self { session_id: SessionIdField::Absent, error_message: None };
        };

        let session_id = match object.get("session_id") {
            None => SessionIdField::Absent,
            Some(Value::Null) => SessionIdField::Null,
            Some(Value::String(id)) => SessionIdField::Present(id.clone()),
            Some(other) => SessionIdField::Present(other.to_string()),
        };
        let error_message =
            object.get("error_message").and_then(Value::as_str).map(str::to_owned);

        Self { session_id, error_message }
    }
}

/// Decides whether an error body describes a session problem.
///
/// Swap the implementation once the backend reports a structured error code.
pub trait SessionProblemDetector: Send + Sync {
    fn indicates_session_problem(&self, response: &ErrorResponse) -> bool;
}

/// `session_id` explicitly null, or an `error_message` containing "session"
/// in any case.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSessionDetector;

impl SessionProblemDetector for HeuristicSessionDetector {
    fn indicates_session_problem(&self, response: &ErrorResponse) -> bool {
        response.session_id == SessionIdField::Null
            || response
                .error_message
                .as_deref()
                .is_some_and(|message| message.to_lowercase().contains("session"))
    }
}

/// Whether a failed response qualifies for the forced-token retry.
pub fn is_session_failure(
    detector: &dyn SessionProblemDetector,
    status: StatusCode,
    body: &Value,
) -> bool {
    status == SESSION_FAILURE_STATUS
        && detector.indicates_session_problem(&ErrorResponse::from_body(body))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn detect(status: u16, body: Value) -> bool {
        is_session_failure(&HeuristicSessionDetector, StatusCode::from_u16(status).unwrap(), &body)
    }

    #[test]
    fn null_session_id_on_500_is_session_failure() {
        assert!(detect(500, json!({ "session_id": null, "error_message": "boom" })));
    }

    #[test]
    fn message_match_is_case_insensitive() {
        assert!(detect(500, json!({ "error_message": "Session Expired" })));
        assert!(detect(500, json!({ "session_id": "sess_1", "error_message": "invalid SESSION" })));
    }

    #[test]
    fn absent_session_id_alone_is_not_session_failure() {
        assert!(!detect(500, json!({ "error_message": "database unavailable" })));
        assert!(!detect(500, json!({})));
    }

    #[test]
    fn other_statuses_never_qualify() {
        assert!(!detect(404, json!({ "session_id": null, "error_message": "session expired" })));
        assert!(!detect(502, json!({ "session_id": null })));
        assert!(!detect(401, json!({ "error_message": "session expired" })));
    }

    #[test]
    fn non_object_bodies_never_qualify() {
        assert!(!detect(500, Value::String("session expired".into())));
        assert!(!detect(500, Value::Null));
    }

    #[test]
    fn non_string_fields_are_tolerated() {
        let parsed = ErrorResponse::from_body(&json!({ "session_id": 42, "error_message": 7 }));
        assert_eq!(parsed.session_id, SessionIdField::Present("42".into()));
        assert_eq!(parsed.error_message, None);
    }
}
