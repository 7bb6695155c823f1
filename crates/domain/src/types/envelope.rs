//! Response envelope shared by every CRM endpoint

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wrapper the backend puts around every payload.
///
/// ```json
/// { "success": true, "data": { ... }, "session_id": "sess_...",
///   "execution_time": 0.12, "error_message": null }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub session_id: Option<String>,
    pub execution_time: Option<f64>,
    pub error_message: Option<String>,
}

/// An envelope that reported `success: false` or carried no data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .error_message.as_deref().unwrap_or("request was not successful"))]
pub struct RejectedEnvelope {
    pub error_message: Option<String>,
    pub session_id: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload of a successful envelope.
    ///
    /// # Errors
    /// Returns [`RejectedEnvelope`] when `success` is false or `data` is
    /// missing.
    pub fn into_data(self) -> Result<T, RejectedEnvelope> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(RejectedEnvelope {
                error_message: self.error_message,
                session_id: self.session_id,
            }),
        }
    }
}
