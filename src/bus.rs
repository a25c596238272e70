//! In-process scoped publish/subscribe bus.
//!
//! Components never share mutable state directly; the bus is the only
//! cross-component channel. Subscriptions are keyed by owner so teardown can
//! remove everything a component registered in one call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

static OWNER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies the component that owns a set of subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Allocate a fresh process-wide unique id.
    pub fn next() -> Self {
        Self(OWNER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Global signals broadcast across components.
///
/// Only authorization, maintenance and database outages propagate globally;
/// every other error stays local to the widget that observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    LoginRequired,
    MaintenanceBanner,
    DatabaseDown,
    SupportBanner,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::LoginRequired => "login_required",
            Signal::MaintenanceBanner => "maintenance_banner",
            Signal::DatabaseDown => "database_down",
            Signal::SupportBanner => "support_banner",
        }
    }
}

pub type Callback = Arc<dyn Fn(Signal, &Value) + Send + Sync>;

struct Subscription {
    owner: OwnerId,
    signal: Signal,
    scope_key: Option<String>,
    callback: Callback,
}

/// Clone-able handle to a shared subscription registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<RwLock<Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(
        &self,
        owner: OwnerId,
        signal: Signal,
        scope_key: Option<&str>,
        callback: Callback,
    ) {
        self.inner.write().push(Subscription {
            owner,
            signal,
            scope_key: scope_key.map(str::to_string),
            callback,
        });
    }

    /// Remove every subscription registered by `owner`. Returns the count.
    pub fn remove_by_owner(&self, owner: OwnerId) -> usize {
        let mut subs = self.inner.write();
        let before = subs.len();
        subs.retain(|s| s.owner != owner);
        before - subs.len()
    }

    /// Remove `owner`'s subscriptions for one signal. Returns the count.
    pub fn remove_by_signal(&self, owner: OwnerId, signal: Signal) -> usize {
        let mut subs = self.inner.write();
        let before = subs.len();
        subs.retain(|s| !(s.owner == owner && s.signal == signal));
        before - subs.len()
    }

    /// Dispatch to listeners registered for `signal` under `scope_key`.
    /// Returns the number of callbacks invoked.
    pub fn dispatch_to_context(&self, signal: Signal, scope_key: &str, payload: &Value) -> usize {
        let callbacks = self.matching(signal, Some(scope_key));
        trace!(signal = signal.as_str(), scope_key, count = callbacks.len(), "dispatch_to_context");
        for cb in &callbacks {
            cb(signal, payload);
        }
        callbacks.len()
    }

    /// Dispatch to every listener registered for `signal`, regardless of scope.
    pub fn dispatch_to_all(&self, signal: Signal, payload: &Value) -> usize {
        let callbacks = self.matching(signal, None);
        trace!(signal = signal.as_str(), count = callbacks.len(), "dispatch_to_all");
        for cb in &callbacks {
            cb(signal, payload);
        }
        callbacks.len()
    }

    // Callbacks are cloned out before invocation so a callback may subscribe
    // or unsubscribe without deadlocking on the registry lock.
    fn matching(&self, signal: Signal, scope_key: Option<&str>) -> Vec<Callback> {
        self.inner
            .read()
            .iter()
            .filter(|s| s.signal == signal)
            .filter(|s| match scope_key {
                Some(key) => s.scope_key.as_deref() == Some(key),
                None => true,
            })
            .map(|s| Arc::clone(&s.callback))
            .collect()
    }
}
