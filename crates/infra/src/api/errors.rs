//! API-specific error types
//!
//! Classifies failed calls so callers can branch on status and message.

use std::fmt;
use std::time::Duration;

use fieldcrm_domain::{FieldCrmError, RejectedEnvelope};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Session provider not initialised, or the server rejected the credentials
    Authentication,
    /// Server error caused by an invalid or missing session
    Session,
    /// Other server errors (5xx)
    Server,
    /// Client errors (4xx)
    Client,
    /// No response received
    Network,
    /// Misconfiguration or an unusable response
    Config,
}

/// A non-2xx response: status code plus decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
    pub status: StatusCode,
    pub body: Value,
}

impl HttpFailure {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// The server's `error_message`, if the body carries one.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error_message").and_then(Value::as_str)
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.status)?;
        match self.error_message() {
            Some(message) => write!(f, ": {message}"),
            None => Ok(()),
        }
    }
}

/// API operation errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Auth not ready: wait until the session provider finishes initializing")]
    AuthNotReady,

    #[error("Session error: {0}")]
    Session(HttpFailure),

    #[error("Server responded with {0}")]
    Status(HttpFailure),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::AuthNotReady | Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::Session(_) => ApiErrorCategory::Session,
            Self::Status(failure) if failure.status.is_server_error() => ApiErrorCategory::Server,
            Self::Status(failure)
                if failure.status == StatusCode::UNAUTHORIZED
                    || failure.status == StatusCode::FORBIDDEN =>
            {
                ApiErrorCategory::Authentication
            }
            Self::Status(_) | Self::Rejected(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) | Self::Decode(_) => ApiErrorCategory::Config,
        }
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Session(failure) | Self::Status(failure) => Some(failure.status),
            _ => None,
        }
    }

    /// The failed response, if one was received.
    pub fn failure(&self) -> Option<&HttpFailure> {
        match self {
            Self::Session(failure) | Self::Status(failure) => Some(failure),
            _ => None,
        }
    }

    /// Whether this error qualifies for the forced-token retry.
    pub fn is_session_recoverable(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Whether no response was received at all.
    pub fn is_no_response(&self) -> bool {
        matches!(self.category(), ApiErrorCategory::Network)
    }
}

/// Convert transport and configuration failures into API errors
impl From<FieldCrmError> for ApiError {
    fn from(err: FieldCrmError) -> Self {
        match err {
            FieldCrmError::Network(message) => Self::Network(message),
            FieldCrmError::Timeout(timeout) => Self::Timeout(timeout),
            FieldCrmError::Config(message) | FieldCrmError::InvalidInput(message) => {
                Self::Config(message)
            }
        }
    }
}

impl From<RejectedEnvelope> for ApiError {
    fn from(rejected: RejectedEnvelope) -> Self {
        Self::Rejected(rejected.to_string())
    }
}
