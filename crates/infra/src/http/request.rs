//! Outgoing request descriptor.

use std::collections::BTreeMap;

use fieldcrm_domain::constants::BEARER_PREFIX;
use fieldcrm_domain::Result;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use url::form_urlencoded;

use crate::errors::InfraError;

/// Query parameters attached to a request.
pub type QueryParams = BTreeMap<String, String>;

/// A single outgoing call: built per call, mutated by the interceptors,
/// discarded once the call completes.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    method: Method,
    path: String,
    query: Option<QueryParams>,
    body: Option<Value>,
    headers: HeaderMap,
    bearer_override: Option<String>,
}

impl OutgoingRequest {
    /// Create a descriptor with no headers.
    ///
    /// Prefer [`crate::http::HttpClient::request`], which seeds the client's
    /// default headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            headers: HeaderMap::new(),
            bearer_override: None,
        }
    }

    pub fn with_query(mut self, query: Option<QueryParams>) -> Self {
        self.query = query.filter(|params| !params.is_empty());
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Pin a bearer token to this request only.
    ///
    /// The transport applies it after every interceptor has run, so it wins
    /// over whatever an interceptor attached.
    pub fn with_bearer_override(mut self, token: impl Into<String>) -> Self {
        self.bearer_override = Some(token.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&QueryParams> {
        self.query.as_ref()
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn bearer_override(&self) -> Option<&str> {
        self.bearer_override.as_deref()
    }

    /// Set or overwrite `Authorization: Bearer <token>`.
    ///
    /// # Errors
    /// Returns `FieldCrmError::InvalidInput` if the token cannot be encoded
    /// as a header value.
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let mut value =
            HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}")).map_err(InfraError::from)?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Whether an `Authorization` header is currently present.
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Full URL of this request against `base_url`.
    pub fn full_url(&self, base_url: &str) -> String {
        let mut url = join_url(base_url, &self.path);
        if let Some(query) = &self.query {
            let encoded = encode_query(query);
            if !encoded.is_empty() {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&encoded);
            }
        }
        url
    }
}

/// Resolve `path` against `base_url`.
///
/// Absolute URLs are returned unchanged; otherwise the two parts are joined
/// with exactly one `/`.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || base_url.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base_url.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Form-urlencode query parameters (`a=b&c=d`, spaces as `+`).
pub fn encode_query(query: &QueryParams) -> String {
    form_urlencoded::Serializer::new(String::new()).extend_pairs(query.iter()).finish()
}
