//! Typed CRM endpoints
//!
//! Thin wrappers over [`ApiClient`] that decode the server envelope into the
//! domain payloads used by the dashboard, schedule and onboarding views.

use std::sync::Arc;

use fieldcrm_domain::constants::{
    ENDPOINT_MEETINGS_SPLIT, ENDPOINT_ONBOARDING, ENDPOINT_PRE_PLAN, ENDPOINT_TEU_TARGET_STATUS,
};
use fieldcrm_domain::types::{ApiEnvelope, MeetingsSplit, OnboardingStatus, PrePlan, TargetStatus};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::client::ApiClient;
use super::errors::ApiError;
use crate::http::QueryParams;

/// API commands for CRM read models
#[derive(Debug, Clone)]
pub struct ApiCommands {
    client: Arc<ApiClient>,
}

impl ApiCommands {
    /// Create a new commands instance
    ///
    /// # Arguments
    ///
    /// * `client` - API client
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Whether the signed-in user finished onboarding, plus their profile
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the server rejects it, or the
    /// payload does not match [`OnboardingStatus`]
    #[instrument(skip(self))]
    pub async fn onboarding_status(&self) -> Result<OnboardingStatus, ApiError> {
        let body = self.client.get(ENDPOINT_ONBOARDING, None).await?;
        decode_envelope(ENDPOINT_ONBOARDING, body)
    }

    /// TEU targets and achievement, per month and for the year
    ///
    /// # Errors
    ///
    /// Same as [`ApiCommands::onboarding_status`]
    #[instrument(skip(self))]
    pub async fn teu_target_status(&self) -> Result<TargetStatus, ApiError> {
        let body = self.client.get(ENDPOINT_TEU_TARGET_STATUS, None).await?;
        decode_envelope(ENDPOINT_TEU_TARGET_STATUS, body)
    }

    /// Meeting counts by type, split monthly, quarterly and yearly
    ///
    /// # Errors
    ///
    /// Same as [`ApiCommands::onboarding_status`]
    #[instrument(skip(self))]
    pub async fn meetings_split(&self) -> Result<MeetingsSplit, ApiError> {
        let body = self.client.get(ENDPOINT_MEETINGS_SPLIT, None).await?;
        decode_envelope(ENDPOINT_MEETINGS_SPLIT, body)
    }

    /// Planned customer visits for a calendar month
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for a month outside 1..=12, otherwise the
    /// same as [`ApiCommands::onboarding_status`]
    #[instrument(skip(self))]
    pub async fn pre_plan(&self, year: i32, month: u32) -> Result<PrePlan, ApiError> {
        if !(1..=12).contains(&month) {
            return Err(ApiError::Config(format!("month must be between 1 and 12, got {month}")));
        }

        let mut params = QueryParams::new();
        params.insert("year".to_string(), year.to_string());
        params.insert("month".to_string(), month.to_string());

        let body = self.client.get(ENDPOINT_PRE_PLAN, Some(params)).await?;
        decode_envelope(ENDPOINT_PRE_PLAN, body)
    }
}

fn decode_envelope<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T, ApiError> {
    let envelope: ApiEnvelope<T> = serde_json::from_value(body)
        .map_err(|e| ApiError::Decode(format!("{endpoint}: {e}")))?;
    debug!(
        endpoint,
        success = envelope.success,
        execution_time = envelope.execution_time,
        "decoded envelope"
    );
    Ok(envelope.into_data()?)
}
