use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fieldcrm_infra::{
    ApiClient, ApiError, HttpClient, InterceptorHandle, SessionProvider, TokenAttacher,
};
use tracing::subscriber::DefaultGuard;
use wiremock::MockServer;

/// Session provider with scripted answers for cached and forced lookups.
///
/// Forced lookups never touch the cached answer, so a forced token showing
/// up on a later request can only come from a leaked override.
pub struct MockSessionProvider {
    ready: AtomicBool,
    cached: Mutex<Option<String>>,
    fresh: Mutex<Option<String>>,
    cached_calls: AtomicUsize,
    forced_calls: AtomicUsize,
    refresh_fails: AtomicBool,
}

impl MockSessionProvider {
    pub fn new(cached: Option<&str>, fresh: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(true),
            cached: Mutex::new(cached.map(str::to_owned)),
            fresh: Mutex::new(fresh.map(str::to_owned)),
            cached_calls: AtomicUsize::new(0),
            forced_calls: AtomicUsize::new(0),
            refresh_fails: AtomicBool::new(false),
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Make forced lookups fail with an auth error.
    pub fn fail_refresh(&self) {
        self.refresh_fails.store(true, Ordering::SeqCst);
    }

    pub fn cached_calls(&self) -> usize {
        self.cached_calls.load(Ordering::SeqCst)
    }

    pub fn forced_calls(&self) -> usize {
        self.forced_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn token(&self, force_refresh: bool) -> Result<Option<String>, ApiError> {
        if force_refresh {
            self.forced_calls.fetch_add(1, Ordering::SeqCst);
            if self.refresh_fails.load(Ordering::SeqCst) {
                return Err(ApiError::Auth("token endpoint unavailable".into()));
            }
            return Ok(self.fresh.lock().expect("token mutex poisoned").clone());
        }
        self.cached_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cached.lock().expect("token mutex poisoned").clone())
    }
}

/// A transport pointed at the mock server, an attacher installed on it and a
/// facade sharing both.
pub struct Harness {
    pub http: Arc<HttpClient>,
    pub client: ApiClient,
    pub attacher: InterceptorHandle,
}

impl Harness {
    pub fn new(server: &MockServer, provider: Arc<MockSessionProvider>) -> Self {
        Self::with_options(server, provider, Duration::from_secs(5), false)
    }

    pub fn with_options(
        server: &MockServer,
        provider: Arc<MockSessionProvider>,
        timeout: Duration,
        mask_tokens: bool,
    ) -> Self {
        let http = Arc::new(
            HttpClient::builder()
                .base_url(server.uri())
                .timeout(timeout)
                .build()
                .expect("transport should build"),
        );
        let attacher = TokenAttacher::new(provider.clone()).install(&http);
        let client = ApiClient::builder()
            .http(http.clone())
            .session(provider)
            .mask_tokens(mask_tokens)
            .build()
            .expect("client should build");
        Self { http, client, attacher }
    }
}

/// Captured formatted log output for the current thread.
#[derive(Clone, Default)]
pub struct LogHandle {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogHandle {
    pub fn output(&self) -> String {
        let guard = self.buffer.lock().expect("log mutex poisoned");
        String::from_utf8_lossy(&guard).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.output().contains(needle)
    }
}

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log mutex poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install a thread-local subscriber that records every event. Keep the guard
/// alive for the duration of the test.
pub fn capture_logs() -> (LogHandle, DefaultGuard) {
    let handle = LogHandle::default();
    let buffer = handle.buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || BufferWriter(buffer.clone()))
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (handle, guard)
}
