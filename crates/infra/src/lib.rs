//! # FieldCRM Infrastructure
//!
//! Impure side of the FieldCRM client: everything that talks to the network,
//! the environment or the file system.
//!
//! This crate contains:
//! - The HTTP transport with its request-interceptor registry
//! - The authenticated API client (token attacher, session retry, curl
//!   diagnostics) and typed CRM endpoints
//! - Configuration loading from environment variables and files
//!
//! ## Architecture
//! - Depends on `fieldcrm-domain` for configuration, payload and error types
//! - Structured `tracing` only; subscribers are installed by the binary

pub mod api;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiCommands, ApiError, CachingSessionProvider, SessionProvider,
    StaticSessionProvider, TokenAttacher, TokenSource,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, InterceptorHandle, OutgoingRequest, QueryParams};
