//! Request interceptor registry.
//!
//! Interceptors run against every outgoing request before it is sent. The
//! registry is shared by every clone of an [`HttpClient`](super::HttpClient);
//! each send works on a snapshot taken when it starts, so removing an
//! interceptor never affects a request that is already in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::request::OutgoingRequest;

/// Hook that runs against every outgoing request.
///
/// Implementations must not fail: anything that goes wrong is logged and the
/// request continues.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn intercept(&self, request: &mut OutgoingRequest);
}

/// Identifier assigned when an interceptor is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

type Entry = (InterceptorId, Arc<dyn RequestInterceptor>);

/// Ordered, process-wide list of interceptors.
#[derive(Default)]
pub struct InterceptorRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<Entry>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; it runs after every interceptor added before it.
    pub fn add(&self, interceptor: Arc<dyn RequestInterceptor>) -> InterceptorId {
        let id = InterceptorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(interceptor = interceptor.name(), id = id.0, "registering request interceptor");
        self.entries.write().push((id, interceptor));
        id
    }

    /// Remove an interceptor. Returns `false` if it was already gone.
    pub fn remove(&self, id: InterceptorId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if removed {
            debug!(id = id.0, "removed request interceptor");
        }
        removed
    }

    /// Interceptors in registration order, as of now.
    pub fn snapshot(&self) -> Vec<Arc<dyn RequestInterceptor>> {
        self.entries.read().iter().map(|(_, interceptor)| Arc::clone(interceptor)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Disposer returned when an interceptor is installed.
///
/// [`eject`](Self::eject) removes the interceptor; calling it again is a
/// no-op. Dropping the handle leaves the interceptor installed.
#[must_use = "keep the handle to be able to eject the interceptor"]
#[derive(Debug)]
pub struct InterceptorHandle {
    id: InterceptorId,
    registry: Weak<InterceptorRegistry>,
    ejected: AtomicBool,
}

impl InterceptorHandle {
    pub(crate) fn new(id: InterceptorId, registry: &Arc<InterceptorRegistry>) -> Self {
        Self { id, registry: Arc::downgrade(registry), ejected: AtomicBool::new(false) }
    }

    pub fn id(&self) -> InterceptorId {
        self.id
    }

    /// Remove the interceptor from its registry.
    pub fn eject(&self) {
        if self.ejected.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    pub fn is_ejected(&self) -> bool {
        self.ejected.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> =
            self.entries.read().iter().map(|(_, interceptor)| interceptor.name()).collect();
        f.debug_struct("InterceptorRegistry").field("interceptors", &names).finish()
    }
}
