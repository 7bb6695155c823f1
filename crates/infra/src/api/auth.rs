//! Session tokens and the interceptor that attaches them.
//!
//! The session provider is whatever issues bearer tokens for the signed-in
//! user. The API layer only needs two things from it: whether it has finished
//! initialising, and a token (cached or forcibly refreshed).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fieldcrm_domain::constants::TOKEN_REFRESH_THRESHOLD_SECS;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::diagnostics::{decode_jwt_claims, token_expiry};
use super::errors::ApiError;
use crate::http::{HttpClient, InterceptorHandle, OutgoingRequest, RequestInterceptor};

/// Source of session tokens for the signed-in user
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Whether the provider has finished initialising.
    fn is_ready(&self) -> bool;

    /// Current bearer token, or `None` when nobody is signed in.
    ///
    /// With `force_refresh` the provider must bypass any cache.
    async fn token(&self, force_refresh: bool) -> Result<Option<String>, ApiError>;
}

/// Provider backed by a single pre-issued token.
///
/// Always ready; a forced refresh returns the same token.
#[derive(Clone, Default)]
pub struct StaticSessionProvider {
    token: Option<String>,
}

impl StaticSessionProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.filter(|t| !t.trim().is_empty()) }
    }
}

impl std::fmt::Debug for StaticSessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSessionProvider").field("has_token", &self.token.is_some()).finish()
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    fn is_ready(&self) -> bool {
        true
    }

    async fn token(&self, _force_refresh: bool) -> Result<Option<String>, ApiError> {
        Ok(self.token.clone())
    }
}

/// Issues fresh tokens on demand (e.g. the identity provider's session API).
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<Option<String>, ApiError>;
}

/// Session provider that caches tokens from a [`TokenSource`]
///
/// Manages the token lifecycle:
/// 1. Not ready until [`initialize`](Self::initialize) has run
/// 2. Serves the cached token until its `exp` claim is within the refresh
///    threshold
/// 3. A forced call always goes to the source and replaces the cache
pub struct CachingSessionProvider<S: TokenSource + 'static> {
    source: Arc<S>,
    current: Arc<RwLock<Option<String>>>,
    ready: AtomicBool,
    refresh_threshold_seconds: i64,
}

impl<S: TokenSource + 'static> CachingSessionProvider<S> {
    /// Create a provider refreshing tokens
    /// [`TOKEN_REFRESH_THRESHOLD_SECS`] before expiry.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_threshold(source, TOKEN_REFRESH_THRESHOLD_SECS)
    }

    #[must_use]
    pub fn with_threshold(source: S, refresh_threshold_seconds: i64) -> Self {
        Self {
            source: Arc::new(source),
            current: Arc::new(RwLock::new(None)),
            ready: AtomicBool::new(false),
            refresh_threshold_seconds,
        }
    }

    /// Prime the cache and mark the provider ready.
    ///
    /// # Returns
    /// `true` if a token was loaded, `false` if nobody is signed in
    ///
    /// # Errors
    /// Returns error if the token source fails; the provider stays not ready
    pub async fn initialize(&self) -> Result<bool, ApiError> {
        let token = self.source.fetch_token().await?;
        let loaded = token.is_some();
        *self.current.write().await = token;
        self.ready.store(true, Ordering::Release);

        if loaded {
            info!("Session provider initialized with a token");
        } else {
            debug!("Session provider initialized without a signed-in session");
        }
        Ok(loaded)
    }

    /// Drop the cached token (sign-out).
    pub async fn clear(&self) {
        *self.current.write().await = None;
        info!("Session token cleared");
    }

    fn needs_refresh(&self, token: &str) -> bool {
        match token_expiry(token) {
            Some(expiry) => {
                expiry.timestamp() - Utc::now().timestamp() <= self.refresh_threshold_seconds
            }
            None => false,
        }
    }

    async fn refresh(&self) -> Result<Option<String>, ApiError> {
        let token = self.source.fetch_token().await?;
        *self.current.write().await = token.clone();
        debug!(has_token = token.is_some(), "Session token refreshed");
        Ok(token)
    }
}

#[async_trait]
impl<S: TokenSource + 'static> SessionProvider for CachingSessionProvider<S> {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn token(&self, force_refresh: bool) -> Result<Option<String>, ApiError> {
        if !force_refresh {
            let cached = self.current.read().await.clone();
            match cached {
                Some(token) if !self.needs_refresh(&token) => return Ok(Some(token)),
                Some(_) => debug!("Cached session token is near expiry"),
                None => {}
            }
        }
        self.refresh().await
    }
}

/// Request interceptor that sets `Authorization: Bearer <token>` from the
/// session provider's current (non-forced) token.
///
/// Never fails a request: when no token can be obtained the request goes out
/// without the header.
pub struct TokenAttacher {
    provider: Arc<dyn SessionProvider>,
    log_claims: bool,
}

impl TokenAttacher {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider, log_claims: false }
    }

    /// Log decoded JWT claims at debug level whenever a token is attached.
    pub fn with_claim_logging(mut self, enabled: bool) -> Self {
        self.log_claims = enabled;
        self
    }

    /// Register on `client`; keep the returned handle to eject it later.
    pub fn install(self, client: &HttpClient) -> InterceptorHandle {
        info!("Installing session token interceptor");
        client.add_interceptor(Arc::new(self))
    }
}

#[async_trait]
impl RequestInterceptor for TokenAttacher {
    fn name(&self) -> &'static str {
        "token_attacher"
    }

    async fn intercept(&self, request: &mut OutgoingRequest) {
        let token = match self.provider.token(false).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!(
                    path = request.path(),
                    "No session token available; sending unauthenticated"
                );
                return;
            }
            Err(err) => {
                warn!(path = request.path(), error = %err, "Failed to obtain session token");
                return;
            }
        };

        if self.log_claims {
            match decode_jwt_claims(&token) {
                Some(claims) => debug!(path = request.path(), %claims, "attaching session token"),
                None => debug!(path = request.path(), "attaching opaque session token"),
            }
        }

        if let Err(err) = request.set_bearer(&token) {
            warn!(path = request.path(), error = %err, "Failed to attach session token");
        }
    }
}
