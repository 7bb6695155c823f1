//! Resilient request facade
//!
//! Verb-level calls (`get`, `post`, `put`, `delete`) over the shared
//! [`HttpClient`]. A failed call is retried at most once, and only when the
//! server reports a session failure; every terminal failure is logged as a
//! replayable curl command before it is returned.

use std::sync::Arc;

use fieldcrm_domain::constants::{BEARER_PREFIX, MISSING_AUTHORIZATION};
use fieldcrm_domain::DiagnosticsConfig;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::auth::SessionProvider;
use super::diagnostics::FailureRecord;
use super::errors::{ApiError, HttpFailure};
use super::session::{is_session_failure, HeuristicSessionDetector, SessionProblemDetector};
use crate::http::{HttpClient, OutgoingRequest, QueryParams};

/// API client with a single forced-token retry on session failures
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<HttpClient>,
    session: Arc<dyn SessionProvider>,
    detector: Arc<dyn SessionProblemDetector>,
    mask_tokens: bool,
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthNotReady`] before any network call if the
    /// session provider is still initialising, otherwise the failure of the
    /// original attempt.
    #[instrument(skip(self, params), fields(path = %path))]
    pub async fn get(&self, path: &str, params: Option<QueryParams>) -> Result<Value, ApiError> {
        let request = self.http.request(Method::GET, path).with_query(params);
        self.execute(request).await
    }

    /// Execute a POST request with an optional JSON body
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let request = self.http.request(Method::POST, path).with_body(body);
        self.execute(request).await
    }

    /// Execute a PUT request with an optional JSON body
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let request = self.http.request(Method::PUT, path).with_body(body);
        self.execute(request).await
    }

    /// Execute a DELETE request
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let request = self.http.request(Method::DELETE, path);
        self.execute(request).await
    }

    async fn execute(&self, request: OutgoingRequest) -> Result<Value, ApiError> {
        if !self.session.is_ready() {
            warn!(path = request.path(), "Rejecting request: session provider not ready");
            return Err(ApiError::AuthNotReady);
        }

        let mut attempt = request.clone();
        let err = match self.dispatch(&mut attempt).await {
            Ok(body) => return Ok(body),
            Err(err) => err,
        };

        if err.is_session_recoverable() {
            if let Some(body) = self.retry_with_fresh_token(&request).await {
                return Ok(body);
            }
        }

        self.report_failure(&attempt, &err, true).await;
        Err(err)
    }

    /// Send once and classify the outcome.
    async fn dispatch(&self, request: &mut OutgoingRequest) -> Result<Value, ApiError> {
        let response = self.http.send(request).await?;
        if response.is_success() {
            return Ok(response.body);
        }

        let failure = HttpFailure::new(response.status, response.body);
        if is_session_failure(self.detector.as_ref(), failure.status, &failure.body) {
            Err(ApiError::Session(failure))
        } else {
            Err(ApiError::Status(failure))
        }
    }

    /// Reissue `request` once with a forcibly refreshed token.
    ///
    /// Returns the body on success; `None` when no fresh token was available
    /// or the retry failed too.
    async fn retry_with_fresh_token(&self, request: &OutgoingRequest) -> Option<Value> {
        let token = match self.session.token(true).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!(path = request.path(), "Session failure but no fresh token available");
                return None;
            }
            Err(err) => {
                warn!(path = request.path(), error = %err, "Forced token refresh failed");
                return None;
            }
        };

        info!(path = request.path(), "Retrying request with refreshed session token");
        let mut retry = request.clone().with_bearer_override(token);
        match self.dispatch(&mut retry).await {
            Ok(body) => {
                info!(path = request.path(), "Retry with refreshed token succeeded");
                Some(body)
            }
            Err(retry_err) => {
                self.report_failure(&retry, &retry_err, false).await;
                None
            }
        }
    }

    async fn report_failure(&self, request: &OutgoingRequest, err: &ApiError, terminal: bool) {
        let failure = err.failure();
        let mut record = FailureRecord::capture(
            request,
            self.http.base_url(),
            failure.map(|f| f.status),
            failure.map(|f| f.body.clone()),
            err.to_string(),
        );

        if record.authorization().is_none() {
            let fallback = match self.session.token(false).await {
                Ok(Some(token)) => format!("{BEARER_PREFIX}{token}"),
                _ => MISSING_AUTHORIZATION.to_string(),
            };
            record.set_authorization(fallback);
        }
        if self.mask_tokens {
            record.mask_authorization();
        }

        let status = record.status.map(|s| s.as_u16());
        let response = record.response_body.as_ref().map(Value::to_string);
        let curl = record.to_curl();
        if terminal {
            error!(
                method = %record.method,
                url = %record.url,
                status,
                response,
                error = %record.error,
                "API request failed\n{curl}"
            );
        } else {
            warn!(
                method = %record.method,
                url = %record.url,
                status,
                response,
                error = %record.error,
                "API retry failed\n{curl}"
            );
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("http", &self.http)
            .field("session_ready", &self.session.is_ready())
            .field("mask_tokens", &self.mask_tokens)
            .finish_non_exhaustive()
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    http: Option<Arc<HttpClient>>,
    session: Option<Arc<dyn SessionProvider>>,
    detector: Option<Arc<dyn SessionProblemDetector>>,
    mask_tokens: bool,
}

impl ApiClientBuilder {
    /// Set the transport (shared with the token attacher)
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Set the session provider
    pub fn session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace the heuristic session-problem detector
    pub fn session_detector(mut self, detector: Arc<dyn SessionProblemDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Mask bearer tokens in failure logs
    pub fn mask_tokens(mut self, enabled: bool) -> Self {
        self.mask_tokens = enabled;
        self
    }

    /// Apply the diagnostics section of the configuration
    pub fn diagnostics(self, config: &DiagnosticsConfig) -> Self {
        self.mask_tokens(config.mask_tokens)
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the transport or session provider is missing
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let http = self.http.ok_or_else(|| ApiError::Config("HTTP client not set".to_string()))?;
        let session =
            self.session.ok_or_else(|| ApiError::Config("Session provider not set".to_string()))?;
        let detector = self.detector.unwrap_or_else(|| Arc::new(HeuristicSessionDetector));

        debug!(base_url = http.base_url(), mask_tokens = self.mask_tokens, "API client built");
        Ok(ApiClient { http, session, detector, mask_tokens: self.mask_tokens })
    }
}
