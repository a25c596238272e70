//! State policy objects and the effects they emit.
//!
//! States never perform I/O. Entering, staying in or exiting a state queues
//! `Effect`s on the scope; the component runtime applies them after the
//! transition has run to completion, so a transition is always atomic from
//! the caller's perspective.

use std::time::Duration;

use tracing::trace;

use crate::config::Settings;
use crate::types::{Context, Key, StateIdentity};
use crate::widget::Widget;

/// Logical timer slots. Arming a slot replaces any timer already in it,
/// which prevents duplicate in-flight callbacks after rapid re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Poll,
    Retry,
    Watchdog,
}

/// What the runtime does when a timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    /// Issue the request for the current state (periodic poll tick).
    Request,
    /// Re-enter the given identity (retry wait elapsed).
    Reenter { target: StateIdentity },
    /// Force the current context into its `Error` key with this message.
    Watchdog { message: String },
}

/// Deferred side effects queued during a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ArmTimer {
        slot: TimerSlot,
        delay: Duration,
        action: TimerAction,
    },
    CancelTimer(TimerSlot),
    CancelAllTimers,
    IssueRequest,
    /// Drop any outstanding request so a late response cannot reach a
    /// halted component.
    AbortRequest,
}

/// FIFO effect queue owned by the component, borrowed by the scope.
#[derive(Debug, Default)]
pub struct Effects {
    queued: Vec<Effect>,
}

impl Effects {
    pub fn push(&mut self, effect: Effect) {
        self.queued.push(effect);
    }

    pub fn drain(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.queued)
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

/// Everything a state or action may touch during one transition.
pub struct Scope<'a> {
    /// Identity current at the time of the call; the machine updates this as
    /// the transition progresses.
    pub identity: Option<StateIdentity>,
    pub widget: &'a mut dyn Widget,
    pub settings: &'a Settings,
    pub effects: &'a mut Effects,
}

/// An action deferred across a transition boundary (pre or post).
pub type Action = Box<dyn FnOnce(&mut Scope<'_>) + Send>;

/// State policy object: one instance per (context, key) per component,
/// created lazily and cached for the component's lifetime.
pub trait State: Send + Sync {
    fn enter(&self, scope: &mut Scope<'_>, from: Option<StateIdentity>);

    fn stay(&self, scope: &mut Scope<'_>) {
        let _ = scope;
    }

    fn exit(&self, scope: &mut Scope<'_>, to: StateIdentity) {
        let _ = (scope, to);
    }
}

/// Passive state: initialization placeholders and steady display states.
pub struct IdleState;

impl State for IdleState {
    fn enter(&self, _scope: &mut Scope<'_>, _from: Option<StateIdentity>) {}
}

/// Loading key of a request context. `poll` distinguishes refresh-forever
/// components: their idempotent re-entry (`stay`) arms the next poll tick
/// instead of firing another request immediately.
pub struct RequestState {
    poll: bool,
}

impl RequestState {
    pub fn single_shot() -> Self {
        Self { poll: false }
    }

    pub fn polling() -> Self {
        Self { poll: true }
    }
}

impl State for RequestState {
    fn enter(&self, scope: &mut Scope<'_>, _from: Option<StateIdentity>) {
        scope.effects.push(Effect::IssueRequest);
    }

    fn stay(&self, scope: &mut Scope<'_>) {
        if self.poll {
            let delay = scope.widget.refresh_rate(scope.settings);
            scope.effects.push(Effect::ArmTimer {
                slot: TimerSlot::Poll,
                delay,
                action: TimerAction::Request,
            });
        }
    }
}

/// Retry wait (`Temporary`, `Delay` or `TransientError` key). Arms the retry
/// timer toward the current context's `Loading` key; re-entry re-arms it.
pub struct RetryState;

impl RetryState {
    fn arm(&self, scope: &mut Scope<'_>) {
        let Some(identity) = scope.identity else {
            return;
        };
        trace!(identity = %identity, "arming retry timer");
        scope.effects.push(Effect::ArmTimer {
            slot: TimerSlot::Retry,
            delay: scope.settings.delay_rate,
            action: TimerAction::Reenter {
                target: StateIdentity::new(identity.context, Key::Loading),
            },
        });
    }
}

impl State for RetryState {
    fn enter(&self, scope: &mut Scope<'_>, _from: Option<StateIdentity>) {
        self.arm(scope);
    }

    fn stay(&self, scope: &mut Scope<'_>) {
        self.arm(scope);
    }
}

/// Fatal error display. Stops periodic work; the message is rendered by the
/// pre-action of the transition that entered it.
pub struct ErrorState;

impl State for ErrorState {
    fn enter(&self, scope: &mut Scope<'_>, _from: Option<StateIdentity>) {
        scope.effects.push(Effect::CancelTimer(TimerSlot::Poll));
        scope.effects.push(Effect::CancelTimer(TimerSlot::Retry));
    }
}

/// Watchdog state for parameter validation: if nothing resolves the
/// validation before the deadline, the component force-fails to `Error`.
pub struct ValidatingState;

impl State for ValidatingState {
    fn enter(&self, scope: &mut Scope<'_>, _from: Option<StateIdentity>) {
        scope.effects.push(Effect::ArmTimer {
            slot: TimerSlot::Watchdog,
            delay: scope.settings.validation_timeout,
            action: TimerAction::Watchdog {
                message: "parameter validation timed out".to_string(),
            },
        });
    }

    fn exit(&self, scope: &mut Scope<'_>, _to: StateIdentity) {
        scope.effects.push(Effect::CancelTimer(TimerSlot::Watchdog));
    }
}

/// "Nothing to show yet, keep polling": periodically re-enters the request
/// identity. Distinct from the permanent `NotApplicable` context and the
/// fatal `Error` key.
pub struct NotAvailableState {
    resume: StateIdentity,
}

impl NotAvailableState {
    pub fn new(resume_context: Context) -> Self {
        Self {
            resume: StateIdentity::new(resume_context, Key::Loading),
        }
    }

    fn arm(&self, scope: &mut Scope<'_>) {
        let delay = scope.widget.refresh_rate(scope.settings);
        scope.effects.push(Effect::ArmTimer {
            slot: TimerSlot::Poll,
            delay,
            action: TimerAction::Reenter { target: self.resume },
        });
    }
}

impl State for NotAvailableState {
    fn enter(&self, scope: &mut Scope<'_>, _from: Option<StateIdentity>) {
        self.arm(scope);
    }

    fn stay(&self, scope: &mut Scope<'_>) {
        self.arm(scope);
    }
}

/// Terminal or parked state: everything timed stops here. Used for `Stop`,
/// `NotApplicable` and `BeforeDestruction`.
pub struct HaltState;

impl State for HaltState {
    fn enter(&self, scope: &mut Scope<'_>, _from: Option<StateIdentity>) {
        scope.effects.push(Effect::CancelAllTimers);
        scope.effects.push(Effect::AbortRequest);
    }
}
