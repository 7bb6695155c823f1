//! Command-line error type

use fieldcrm_domain::FieldCrmError;
use fieldcrm_infra::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] FieldCrmError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::InvalidArgument(_) => 2,
            Self::Api(ApiError::AuthNotReady | ApiError::Auth(_)) => 3,
            Self::Api(_) => 1,
            Self::Output(_) => 4,
        }
    }
}
