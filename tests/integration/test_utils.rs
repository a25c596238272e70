//! Shared fixtures for the integration suite
//!
//! A scripted transport plus a recording widget let each test drive a real
//! `Component` deterministically under the paused tokio clock, then assert
//! on everything the runtime did to the widget and the bus.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use pulse_lifecycle::{
    Component, ConfigStore, Element, EventBus, OwnerId, Policy, RequestOutcome, Signal, Transport,
    Validation, Widget,
};

/// Replays a fixed script of outcomes and records every requested URL.
/// Once the script runs dry it answers with a connection failure.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<RequestOutcome>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<RequestOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, outcome: RequestOutcome) {
        self.script.lock().push_back(outcome);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn issue(&self, url: &str, _timeout: Duration) -> RequestOutcome {
        self.requests.lock().push(url.to_string());
        self.script
            .lock()
            .pop_front()
            .unwrap_or(RequestOutcome::Failure {
                timeout: false,
                http_status: None,
            })
    }
}

/// Records every runtime callback for later assertions.
pub struct RecordingWidget {
    pub short: String,
    pub validation: Validation,
    pub refreshed: Vec<Value>,
    pub errors: Vec<String>,
    pub errors_cleared: usize,
    pub initialized: usize,
}

impl RecordingWidget {
    pub fn new() -> Self {
        Self {
            short: "status".to_string(),
            validation: Validation::Ok,
            refreshed: Vec::new(),
            errors: Vec::new(),
            errors_cleared: 0,
            initialized: 0,
        }
    }

    pub fn pending_validation() -> Self {
        Self {
            validation: Validation::Pending,
            ..Self::new()
        }
    }

    pub fn invalid_validation(message: &str) -> Self {
        Self {
            validation: Validation::Invalid(message.to_string()),
            ..Self::new()
        }
    }
}

impl Widget for RecordingWidget {
    fn short_url(&self) -> String {
        self.short.clone()
    }

    fn refresh(&mut self, data: &Value) {
        self.refreshed.push(data.clone());
    }

    fn initialize(&mut self, _element: Option<&Element>) {
        self.initialized += 1;
    }

    fn validate_parameters(&mut self, _element: Option<&Element>) -> Validation {
        self.validation.clone()
    }

    fn display_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn remove_error(&mut self) {
        self.errors_cleared += 1;
    }
}

/// Build a component on a fresh bus and empty config store.
pub fn build(
    policy: impl Policy + 'static,
    widget: RecordingWidget,
    transport: Arc<ScriptedTransport>,
) -> Component<RecordingWidget> {
    build_with(
        policy,
        widget,
        transport,
        EventBus::default(),
        ConfigStore::new(),
    )
}

pub fn build_with(
    policy: impl Policy + 'static,
    widget: RecordingWidget,
    transport: Arc<ScriptedTransport>,
    bus: EventBus,
    config: ConfigStore,
) -> Component<RecordingWidget> {
    Component::new(widget, policy, bus, config, transport).unwrap()
}

/// Subscribe a counter to `signal` under a throwaway owner.
pub fn counting_listener(bus: &EventBus, signal: Signal) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&count);
    bus.add_listener(
        OwnerId::next(),
        signal,
        None,
        Arc::new(move |_signal, _payload| {
            hits.fetch_add(1, Ordering::SeqCst);
        }),
    );
    count
}
