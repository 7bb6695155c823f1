//! Authenticated CRM API client
//!
//! This module provides the request pipeline between the app and the CRM
//! backend. It attaches session tokens, retries once on session failures and
//! logs replayable curl commands for failed calls.
//!
//! # Architecture
//!
//! - [`auth::TokenAttacher`] runs as an interceptor on the shared
//!   [`HttpClient`](crate::http::HttpClient) and sets the bearer token
//! - [`client::ApiClient`] exposes `get`/`post`/`put`/`delete`, classifies
//!   failures and performs the forced-token retry
//! - [`commands::ApiCommands`] decodes typed CRM payloads
//! - [`session`] isolates the session-failure heuristic behind a trait

pub mod auth;
pub mod client;
pub mod commands;
pub mod diagnostics;
pub mod errors;
pub mod session;

pub use auth::{
    CachingSessionProvider, SessionProvider, StaticSessionProvider, TokenAttacher, TokenSource,
};
pub use client::{ApiClient, ApiClientBuilder};
pub use commands::ApiCommands;
pub use diagnostics::{decode_jwt_claims, mask_token, token_expiry, FailureRecord};
pub use errors::{ApiError, ApiErrorCategory, HttpFailure};
pub use session::{
    is_session_failure, ErrorResponse, HeuristicSessionDetector, SessionIdField,
    SessionProblemDetector, SESSION_FAILURE_STATUS,
};
