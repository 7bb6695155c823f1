//! Failure diagnostics: reproducible curl commands and token inspection.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use fieldcrm_domain::constants::{BEARER_PREFIX, MISSING_AUTHORIZATION};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;

use crate::http::OutgoingRequest;

/// Decode the claims segment of a JWT without verifying it.
///
/// Returns `None` for anything that is not `header.payload[.signature]` with
/// a base64url JSON payload.
pub fn decode_jwt_claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1).filter(|segment| !segment.is_empty())?;
    let trimmed = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(trimmed).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry (`exp` claim) of a JWT, if it has one.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_jwt_claims(token)?.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

/// Shorten a token for display: `MISSING` for none, short tokens unchanged,
/// otherwise the first and last eight characters.
pub fn mask_token(token: Option<&str>) -> String {
    let Some(token) = token else {
        return MISSING_AUTHORIZATION.to_string();
    };
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 16 {
        return token.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{head}...{tail}")
}

/// Everything known about a failed call.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub status: Option<StatusCode>,
    pub response_body: Option<Value>,
    pub error: String,
}

impl FailureRecord {
    /// Capture the effective request after it went out.
    pub fn capture(
        request: &OutgoingRequest,
        base_url: &str,
        status: Option<StatusCode>,
        response_body: Option<Value>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            method: request.method().as_str().to_uppercase(),
            url: request.full_url(base_url),
            headers: header_pairs(request.headers()),
            body: request.body().cloned(),
            status,
            response_body,
            error: error.into(),
        }
    }

    /// Value of the `Authorization` header, if captured.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
            .map(|(_, value)| value.as_str())
    }

    /// Set the `Authorization` header, replacing any captured value.
    pub fn set_authorization(&mut self, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
        {
            Some((_, existing)) => *existing = value,
            None => self.headers.push(("Authorization".to_string(), value)),
        }
    }

    /// Replace the bearer token with its masked form.
    pub fn mask_authorization(&mut self) {
        if let Some(current) = self.authorization().map(str::to_owned) {
            if let Some(token) = current.strip_prefix(BEARER_PREFIX) {
                self.set_authorization(format!("{BEARER_PREFIX}{}", mask_token(Some(token))));
            }
        }
    }

    /// Render a curl command that replays this request.
    pub fn to_curl(&self) -> String {
        let mut curl = format!("curl -X {} \"{}\"", self.method, self.url);
        for (name, value) in &self.headers {
            let escaped = value.replace('"', "\\\"");
            curl.push_str(&format!(" \\\n  -H \"{name}: {escaped}\""));
        }
        if let Some(body) = &self.body {
            if let Ok(json) = serde_json::to_string(body) {
                let escaped = json.replace('\'', "'\"'\"'");
                curl.push_str(&format!(" \\\n  -d '{escaped}'"));
            }
        }
        curl
    }
}

// Header names are canonicalised for readability; values that are not
// visible ASCII are rendered lossily.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value
                .to_str()
                .map(str::to_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(value.as_bytes()).into_owned());
            (canonical_header_name(name.as_str()), value)
        })
        .collect()
}

fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
