//! Application context - dependency injection container

use std::sync::Arc;

use fieldcrm_domain::Config;
use fieldcrm_infra::{
    ApiClient, ApiCommands, HttpClient, InterceptorHandle, SessionProvider, StaticSessionProvider,
    TokenAttacher,
};
use tracing::{debug, info};

use crate::errors::AppError;

/// Everything a command needs, wired once per process.
///
/// Owns the only [`TokenAttacher`] registration; [`AppContext::shutdown`]
/// removes it.
pub struct AppContext {
    pub config: Config,
    pub http: Arc<HttpClient>,
    pub session: Arc<dyn SessionProvider>,
    pub client: Arc<ApiClient>,
    pub commands: ApiCommands,
    attacher: InterceptorHandle,
}

impl AppContext {
    /// Build the context with a static session provider holding the
    /// configured token.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the transport cannot
    /// be built
    pub fn new(config: Config) -> Result<Self, AppError> {
        let session: Arc<dyn SessionProvider> =
            Arc::new(StaticSessionProvider::new(config.session.token.clone()));
        Self::with_session(config, session)
    }

    /// Build the context around an existing session provider.
    ///
    /// # Errors
    /// Same as [`AppContext::new`]
    pub fn with_session(
        config: Config,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let http = Arc::new(HttpClient::from_config(&config.api)?);
        let attacher = TokenAttacher::new(session.clone())
            .with_claim_logging(config.diagnostics.log_jwt_claims)
            .install(&http);

        let client = Arc::new(
            ApiClient::builder()
                .http(http.clone())
                .session(session.clone())
                .diagnostics(&config.diagnostics)
                .build()?,
        );
        let commands = ApiCommands::new(client.clone());

        info!(
            base_url = %config.api.base_url,
            timeout_secs = config.api.timeout_secs,
            "Application context ready"
        );
        Ok(Self { config, http, session, client, commands, attacher })
    }

    /// Remove the token attacher. Safe to call more than once.
    pub fn shutdown(&self) {
        debug!(already_ejected = self.attacher.is_ejected(), "shutdown called on AppContext");
        self.attacher.eject();
    }

    pub fn is_shut_down(&self) -> bool {
        self.attacher.is_ejected()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("base_url", &self.config.api.base_url)
            .field("client", &self.client)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
