//! HTTP transport.
//!
//! [`HttpClient`] owns the connection pool, the default headers, the request
//! timeout and the process-wide interceptor registry. It returns every
//! response it receives; deciding what counts as a failure is left to the
//! API layer.

pub mod client;
pub mod interceptors;
pub mod request;

pub use client::{HttpClient, HttpClientBuilder, TransportResponse};
pub use interceptors::{InterceptorHandle, InterceptorId, InterceptorRegistry, RequestInterceptor};
pub use request::{encode_query, join_url, OutgoingRequest, QueryParams};
