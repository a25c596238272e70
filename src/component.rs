//! Component runtime: owns one machine, one widget and the timers,
//! subscriptions and in-flight request that keep it alive.
//!
//! All lifecycle work is synchronous inside `connect`/timer/response
//! handling; the only suspension points are the timer sleeps and the
//! outstanding request future awaited by `tick`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::bus::{Callback, EventBus, OwnerId, Signal};
use crate::config::{ConfigStore, Element, Settings};
use crate::error::{ContractViolation, LifecycleError};
use crate::machine::Machine;
use crate::policy::{validate_policy, Policy};
use crate::retry::{self, ErrorPolicy};
use crate::state::{Action, Effect, Effects, Scope, TimerAction, TimerSlot};
use crate::transport::{RequestOutcome, ServerStatus, Transport};
use crate::types::{Context, Key, StateIdentity};
use crate::widget::{Validation, Widget};

struct TimerEntry {
    deadline: Instant,
    action: TimerAction,
}

/// Logical timer slots: arming a slot replaces whatever it held, so rapid
/// re-entry never leaves duplicate callbacks in flight.
#[derive(Default)]
struct Timers {
    entries: HashMap<TimerSlot, TimerEntry>,
}

impl Timers {
    fn arm(&mut self, slot: TimerSlot, deadline: Instant, action: TimerAction) {
        self.entries.insert(slot, TimerEntry { deadline, action });
    }

    fn cancel(&mut self, slot: TimerSlot) {
        self.entries.remove(&slot);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn next(&self) -> Option<(TimerSlot, Instant)> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.deadline)
            .map(|(slot, entry)| (*slot, entry.deadline))
    }

    fn take(&mut self, slot: TimerSlot) -> Option<TimerAction> {
        self.entries.remove(&slot).map(|entry| entry.action)
    }

    fn is_armed(&self, slot: TimerSlot) -> bool {
        self.entries.contains_key(&slot)
    }
}

/// What one call to [`Component::tick`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    TimerFired(TimerSlot),
    RequestCompleted,
    /// No timer armed and no request in flight.
    Idle,
}

pub struct Component<W> {
    owner: OwnerId,
    widget: W,
    policy: Arc<dyn Policy>,
    machine: Machine,
    settings: Settings,
    effects: Effects,
    timers: Timers,
    bus: EventBus,
    config: ConfigStore,
    transport: Arc<dyn Transport>,
    element: Option<Element>,
    connected: bool,
    connected_once: bool,
    retain_state_on_detach: bool,
    destroyed: bool,
    in_flight: Option<BoxFuture<'static, RequestOutcome>>,
    first_failure_at: Option<Instant>,
    resolved_path: Option<String>,
}

impl<W: Widget> Component<W> {
    /// Build a component. Fails fast if the policy's context table has an
    /// unmapped identity.
    pub fn new(
        widget: W,
        policy: impl Policy + 'static,
        bus: EventBus,
        config: ConfigStore,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, LifecycleError> {
        let policy: Arc<dyn Policy> = Arc::new(policy);
        validate_policy(policy.as_ref())?;
        let settings = Settings::resolve(&config, None);
        Ok(Self {
            owner: OwnerId::next(),
            widget,
            policy,
            machine: Machine::new(),
            settings,
            effects: Effects::default(),
            timers: Timers::default(),
            bus,
            config,
            transport,
            element: None,
            connected: false,
            connected_once: false,
            retain_state_on_detach: false,
            destroyed: false,
            in_flight: None,
            first_failure_at: None,
            resolved_path: None,
        })
    }

    /// Preserve state across detach/reattach instead of tearing down.
    /// Used by hosts that reorder component lists.
    pub fn retain_state_on_detach(mut self, retain: bool) -> Self {
        self.retain_state_on_detach = retain;
        self
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn current(&self) -> Option<StateIdentity> {
        self.machine.current()
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_timer_armed(&self, slot: TimerSlot) -> bool {
        self.timers.is_armed(slot)
    }

    pub fn has_request_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn resolved_path(&self) -> Option<&str> {
        self.resolved_path.as_deref()
    }

    /// Register a bus listener owned by this component; teardown removes it.
    pub fn add_listener(&self, signal: Signal, scope_key: Option<&str>, callback: Callback) {
        self.bus.add_listener(self.owner, signal, scope_key, callback);
    }

    /// Attach to an element and start (or restart) the lifecycle.
    ///
    /// A first attach enters the policy's start context; a reattach after
    /// teardown routes through `Reset`. With state retention enabled a
    /// reattach changes nothing.
    pub fn connect(&mut self, element: Element) -> Result<(), LifecycleError> {
        self.settings = Settings::resolve(&self.config, Some(&element));
        self.element = Some(element);
        self.connected = true;

        if self.retain_state_on_detach && !self.destroyed && self.machine.current().is_some() {
            debug!(owner = ?self.owner, "reattached with preserved state");
            return Ok(());
        }

        let start = if self.connected_once {
            Context::Reset
        } else {
            self.policy.start_context()
        };
        self.connected_once = true;
        self.destroyed = false;
        self.first_failure_at = None;
        self.resolved_path = None;
        info!(owner = ?self.owner, start = %start, "starting component");

        self.transition(Some(start), None, None, None)?;
        self.widget.initialize(self.element.as_ref());
        self.transition_next(None, None)?;
        self.run_validation()
    }

    /// Detach from the element. Preserves state when retention is enabled,
    /// otherwise tears the component down.
    pub fn disconnect(&mut self) -> Result<(), LifecycleError> {
        self.connected = false;
        if self.retain_state_on_detach {
            debug!(owner = ?self.owner, "detached, state preserved");
            return Ok(());
        }
        self.destroy()
    }

    /// Force teardown: deregister every subscription, run the deferred
    /// post-action, cancel timers and drop the element reference. The only
    /// transition that cannot be bypassed once the component has started.
    pub fn destroy(&mut self) -> Result<(), LifecycleError> {
        if self.destroyed {
            return Ok(());
        }
        if self.machine.current().is_none() {
            // Never started: nothing to tear down.
            self.element = None;
            self.connected = false;
            return Ok(());
        }
        let removed = self.bus.remove_by_owner(self.owner);
        debug!(owner = ?self.owner, removed, "tearing down");
        self.transition(Some(Context::BeforeDestruction), None, None, None)?;
        self.in_flight = None;
        self.element = None;
        self.connected = false;
        self.destroyed = true;
        Ok(())
    }

    /// Force one more fetch without discarding the last-good render.
    pub fn reload(&mut self) -> Result<(), LifecycleError> {
        self.ensure_active()?;
        self.transition(Some(Context::Reload), None, None, None)
    }

    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        self.ensure_active()?;
        self.transition(Some(Context::Stop), None, None, None)
    }

    /// "Nothing to show yet, keep polling": distinct from the permanent
    /// `NotApplicable` and the fatal `Error` key.
    pub fn switch_to_not_available(&mut self) -> Result<(), LifecycleError> {
        self.ensure_active()?;
        self.transition(Some(Context::NotAvailable), None, None, None)
    }

    /// Complete a pending validation from outside (bus callback, async
    /// attribute fetch). Ignored unless the component is still validating.
    pub fn resolve_validation(&mut self, result: Result<(), String>) -> Result<(), LifecycleError> {
        if self.machine.current()
            != Some(StateIdentity::new(Context::ParamValidation, Key::Validating))
        {
            return Ok(());
        }
        match result {
            Ok(()) => self.complete_validation(),
            Err(message) => self.fail(message),
        }
    }

    /// Success callback: advance first, render after. The widget may assume
    /// its new context/key is current while rendering.
    pub fn manage_success(&mut self, data: Value) -> Result<(), LifecycleError> {
        self.ensure_active()?;
        self.first_failure_at = None;
        let pre: Action = Box::new(move |scope: &mut Scope<'_>| {
            scope.widget.remove_error();
            scope.widget.refresh(&data);
        });
        self.transition_next(Some(pre), None)
    }

    /// Application-error callback: consult the widget's extension hook,
    /// then the built-in retry-policy table.
    pub fn manage_error(
        &mut self,
        status: ServerStatus,
        message: Option<String>,
    ) -> Result<(), LifecycleError> {
        self.ensure_active()?;
        let message = message.unwrap_or_else(|| format!("request failed: {status}"));
        let policy = self
            .widget
            .manage_error_status(&status, &message)
            .unwrap_or_else(|| retry::classify(&status));
        debug!(owner = ?self.owner, status = %status, ?policy, "applying error policy");
        self.apply_error_policy(policy, message)
    }

    /// Transport-failure callback.
    pub fn manage_failure(
        &mut self,
        timeout: bool,
        http_status: Option<u16>,
    ) -> Result<(), LifecycleError> {
        self.ensure_active()?;
        let policy = retry::classify_failure(timeout, http_status);
        let message = if timeout {
            "request timed out".to_string()
        } else {
            match http_status {
                Some(code) => format!("request failed with HTTP status {code}"),
                None => "connection failed".to_string(),
            }
        };
        self.apply_error_policy(policy, message)
    }

    /// Wait for the next timer or the in-flight response and process it.
    pub async fn tick(&mut self) -> Result<TickEvent, LifecycleError> {
        enum Waited {
            Outcome(RequestOutcome),
            Timer(TimerSlot),
        }

        let next_timer = self.timers.next();
        let waited = match (self.in_flight.as_mut(), next_timer) {
            (None, None) => return Ok(TickEvent::Idle),
            (Some(fut), None) => Waited::Outcome(fut.await),
            (None, Some((slot, deadline))) => {
                sleep_until(deadline).await;
                Waited::Timer(slot)
            }
            (Some(fut), Some((slot, deadline))) => {
                tokio::select! {
                    outcome = fut => Waited::Outcome(outcome),
                    _ = sleep_until(deadline) => Waited::Timer(slot),
                }
            }
        };

        match waited {
            Waited::Outcome(outcome) => {
                self.in_flight = None;
                self.handle_outcome(outcome)?;
                Ok(TickEvent::RequestCompleted)
            }
            Waited::Timer(slot) => {
                if let Some(action) = self.timers.take(slot) {
                    self.handle_timer(action)?;
                }
                Ok(TickEvent::TimerFired(slot))
            }
        }
    }

    /// Drive ticks until nothing is pending. Never returns for a healthy
    /// polling component; meant for single-shot flows and tests.
    pub async fn run_until_idle(&mut self) -> Result<(), LifecycleError> {
        while self.tick().await? != TickEvent::Idle {}
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), LifecycleError> {
        if self.destroyed {
            return Err(LifecycleError::Destroyed);
        }
        if self.machine.current().is_none() {
            return Err(LifecycleError::NotConnected);
        }
        Ok(())
    }

    fn transition(
        &mut self,
        context: Option<Context>,
        key: Option<Key>,
        pre: Option<Action>,
        post: Option<Action>,
    ) -> Result<(), LifecycleError> {
        let policy = Arc::clone(&self.policy);
        let mut scope = Scope {
            identity: self.machine.current(),
            widget: &mut self.widget,
            settings: &self.settings,
            effects: &mut self.effects,
        };
        self.machine
            .switch_to_state(policy.as_ref(), &mut scope, context, key, pre, post)?;
        self.apply_effects()
    }

    fn transition_next(
        &mut self,
        pre: Option<Action>,
        post: Option<Action>,
    ) -> Result<(), LifecycleError> {
        let policy = Arc::clone(&self.policy);
        let mut scope = Scope {
            identity: self.machine.current(),
            widget: &mut self.widget,
            settings: &self.settings,
            effects: &mut self.effects,
        };
        self.machine
            .switch_to_next_context(policy.as_ref(), &mut scope, pre, post)?;
        self.apply_effects()
    }

    fn apply_effects(&mut self) -> Result<(), LifecycleError> {
        for effect in self.effects.drain() {
            match effect {
                Effect::ArmTimer { slot, delay, action } => {
                    self.timers.arm(slot, Instant::now() + delay, action);
                }
                Effect::CancelTimer(slot) => self.timers.cancel(slot),
                Effect::CancelAllTimers => self.timers.clear(),
                Effect::IssueRequest => self.issue_request()?,
                Effect::AbortRequest => self.in_flight = None,
            }
        }
        Ok(())
    }

    // At most one request per component per cycle.
    fn issue_request(&mut self) -> Result<(), LifecycleError> {
        if self.in_flight.is_some() {
            debug!(owner = ?self.owner, "request already in flight, skipping");
            return Ok(());
        }
        let url = self.build_url()?;
        let timeout = self.widget.timeout(&self.settings);
        let transport = Arc::clone(&self.transport);
        debug!(owner = ?self.owner, url = %url, "issuing request");
        self.in_flight = Some(Box::pin(async move { transport.issue(&url, timeout).await }));
        Ok(())
    }

    fn build_url(&self) -> Result<String, LifecycleError> {
        let prefix = self.settings.url_prefix.trim_end_matches('/');
        let short = self.widget.short_url();
        let short = short.trim_start_matches('/');
        if self.policy.requires_path() {
            let path = self
                .resolved_path
                .as_deref()
                .map(|p| p.trim_matches('/'))
                .filter(|p| !p.is_empty())
                .ok_or(ContractViolation::EmptyPath)?;
            Ok(format!("{prefix}/{path}/{short}"))
        } else {
            Ok(format!("{prefix}/{short}"))
        }
    }

    fn handle_outcome(&mut self, outcome: RequestOutcome) -> Result<(), LifecycleError> {
        match outcome {
            RequestOutcome::Success(data) => self.manage_success(data),
            RequestOutcome::Error { status, message } => self.manage_error(status, message),
            RequestOutcome::Failure {
                timeout,
                http_status,
            } => self.manage_failure(timeout, http_status),
        }
    }

    fn handle_timer(&mut self, action: TimerAction) -> Result<(), LifecycleError> {
        match action {
            TimerAction::Request => self.issue_request(),
            TimerAction::Reenter { target } => {
                self.transition(Some(target.context), Some(target.key), None, None)
            }
            TimerAction::Watchdog { message } => {
                warn!(owner = ?self.owner, "validation watchdog expired");
                self.fail(message)
            }
        }
    }

    fn apply_error_policy(
        &mut self,
        policy: ErrorPolicy,
        message: String,
    ) -> Result<(), LifecycleError> {
        match policy {
            ErrorPolicy::Fatal => {
                self.bus
                    .dispatch_to_all(Signal::SupportBanner, &json!({ "message": message.as_str() }));
                self.fail(message)
            }
            ErrorPolicy::NotApplicable => {
                self.transition(Some(Context::NotApplicable), None, None, None)
            }
            ErrorPolicy::RetryWithDelay => self.retry_with(Key::Delay, message),
            ErrorPolicy::RetryImmediately => self.retry_with(Key::Temporary, message),
            ErrorPolicy::RefreshAuth => {
                self.bus
                    .dispatch_to_all(Signal::LoginRequired, &json!({ "message": message.as_str() }));
                self.retry_with(Key::Delay, message)
            }
            ErrorPolicy::SystemBanner(signal) => {
                self.bus
                    .dispatch_to_all(signal, &json!({ "message": message.as_str() }));
                if self.widget.keeps_polling_on_system_error() {
                    self.retry_with(Key::Delay, message)
                } else {
                    self.fail(message)
                }
            }
        }
    }

    fn fail(&mut self, message: String) -> Result<(), LifecycleError> {
        warn!(owner = ?self.owner, message = %message, "entering error state");
        // The retry episode ends here; a later reload starts a fresh one.
        self.first_failure_at = None;
        let pre: Action =
            Box::new(move |scope: &mut Scope<'_>| scope.widget.display_error(&message));
        self.transition(None, Some(Key::Error), Some(pre), None)
    }

    fn retry_with(&mut self, base: Key, message: String) -> Result<(), LifecycleError> {
        let now = Instant::now();
        let first = *self.first_failure_at.get_or_insert(now);
        let transient_after = self.widget.transient_error_delay(&self.settings);
        let current = self.machine.current().map(|id| id.key);
        let key = retry::retry_key(base, current, first, now, transient_after);
        info!(owner = ?self.owner, key = %key, message = %message, "scheduling retry");
        let pre: Option<Action> = (key == Key::TransientError).then(|| {
            Box::new(move |scope: &mut Scope<'_>| scope.widget.display_error(&message)) as Action
        });
        self.transition(None, Some(key), pre, None)
    }

    fn run_validation(&mut self) -> Result<(), LifecycleError> {
        if self.machine.current()
            != Some(StateIdentity::new(Context::ParamValidation, Key::Validating))
        {
            return Ok(());
        }
        match self.widget.validate_parameters(self.element.as_ref()) {
            Validation::Ok => self.complete_validation(),
            Validation::Invalid(message) => self.fail(message),
            Validation::Pending => {
                debug!(owner = ?self.owner, "validation pending, watchdog armed");
                Ok(())
            }
        }
    }

    fn complete_validation(&mut self) -> Result<(), LifecycleError> {
        if self.policy.requires_path() {
            let path = self
                .config
                .get_config_or_attribute(self.element.as_ref(), "path", "");
            if path.trim_matches('/').trim().is_empty() {
                return self.fail("missing path".to_string());
            }
            self.resolved_path = Some(path);
        }
        self.transition_next(None, None)
    }
}
