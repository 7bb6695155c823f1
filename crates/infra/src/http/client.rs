use std::sync::Arc;
use std::time::Duration;

use fieldcrm_domain::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT, JSON_MEDIA_TYPE};
use fieldcrm_domain::{ApiConfig, FieldCrmError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::interceptors::{InterceptorHandle, InterceptorRegistry, RequestInterceptor};
use super::request::OutgoingRequest;
use crate::errors::InfraError;

/// Response as seen by the transport: status plus decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// HTTP transport with a shared request-interceptor registry and a fixed
/// per-request timeout.
///
/// Clones share the same connection pool and interceptor registry.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
    default_headers: HeaderMap,
    interceptors: Arc<InterceptorRegistry>,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Build a client from the API section of the configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self, FieldCrmError> {
        let mut builder = Self::builder().base_url(&config.base_url).timeout(config.timeout());
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a request descriptor seeded with the default headers.
    pub fn request(&self, method: Method, path: impl Into<String>) -> OutgoingRequest {
        OutgoingRequest::new(method, path).with_headers(self.default_headers.clone())
    }

    /// Register an interceptor that runs on every subsequent send.
    pub fn add_interceptor(&self, interceptor: Arc<dyn RequestInterceptor>) -> InterceptorHandle {
        let id = self.interceptors.add(interceptor);
        InterceptorHandle::new(id, &self.interceptors)
    }

    pub fn interceptors(&self) -> &Arc<InterceptorRegistry> {
        &self.interceptors
    }

    /// Run the interceptors against `request`, then send it.
    ///
    /// The descriptor is left holding the effective headers that went out,
    /// so callers can report them if the call fails. Any status code is
    /// returned as a response; only transport failures are errors.
    pub async fn send(
        &self,
        request: &mut OutgoingRequest,
    ) -> Result<TransportResponse, FieldCrmError> {
        for interceptor in self.interceptors.snapshot() {
            interceptor.intercept(request).await;
        }

        if let Some(token) = request.bearer_override().map(str::to_owned) {
            request.set_bearer(&token)?;
        }

        let url = request.full_url(&self.base_url);
        let url = url::Url::parse(&url).map_err(InfraError::from)?;
        let method = request.method().clone();

        let mut builder =
            self.client.request(method.clone(), url.clone()).headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(%method, %url, "sending HTTP request");

        let response = builder.send().await.map_err(|err| self.map_send_error(err))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| self.map_send_error(err))?;

        debug!(%method, %url, %status, bytes = bytes.len(), "received HTTP response");

        Ok(TransportResponse { status, body: decode_body(&bytes) })
    }

    fn map_send_error(&self, err: reqwest::Error) -> FieldCrmError {
        if err.is_timeout() {
            warn!(timeout_ms = self.timeout.as_millis() as u64, "HTTP request timed out");
            return FieldCrmError::Timeout(self.timeout);
        }
        InfraError::from(err).into()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

/// Decode a response body: empty is `null`, non-JSON is kept as a string.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: HeaderMap,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));

        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            default_headers,
        }
    }
}

impl HttpClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Add a header to every request, replacing any default with the same name.
    pub fn default_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn build(self) -> Result<HttpClient, FieldCrmError> {
        if self.base_url.trim().is_empty() {
            warn!("API base URL is empty; request paths must be absolute URLs");
        }

        // The agent also goes into the descriptor headers so failure reports
        // show it.
        let agent = self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let agent = HeaderValue::from_str(&agent).map_err(InfraError::from)?;
        let mut default_headers = self.default_headers;
        default_headers.entry(USER_AGENT).or_insert_with(|| agent.clone());

        let builder = ReqwestClient::builder().timeout(self.timeout).user_agent(agent).no_proxy();
        let client = builder.build().map_err(|err| FieldCrmError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            base_url: self.base_url,
            timeout: self.timeout,
            default_headers,
            interceptors: Arc::new(InterceptorRegistry::new()),
        })
    }
}
