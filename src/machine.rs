//! The (context, key) transition engine.
//!
//! One machine per component tracks the single active identity and drives
//! enter/stay/exit hooks. The post-action handed to transition N is deferred:
//! it runs exactly once, at the start of transition N+1 (or at destruction,
//! which is itself a transition). Deferring it guarantees a state's
//! completion side effect lands only once the following state has already
//! begun, which keeps idempotent "stay" re-entry flicker-free.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ContractViolation, LifecycleError};
use crate::policy::Policy;
use crate::state::{Action, Scope, State};
use crate::types::{Context, Key, StateIdentity};

#[derive(Default)]
pub struct Machine {
    current: Option<StateIdentity>,
    states: HashMap<StateIdentity, Arc<dyn State>>,
    pending_post: Option<Action>,
    in_transition: bool,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active identity, or `None` before the first transition.
    pub fn current(&self) -> Option<StateIdentity> {
        self.current
    }

    /// Whether a post-action is still waiting for the next boundary.
    pub fn has_pending_post(&self) -> bool {
        self.pending_post.is_some()
    }

    /// Transition to `(context, key)`.
    ///
    /// Either target may be omitted, not both: a missing key resolves via
    /// the policy's start key for the context; a missing context means
    /// "stay in the current context, change key only".
    pub fn switch_to_state(
        &mut self,
        policy: &dyn Policy,
        scope: &mut Scope<'_>,
        context: Option<Context>,
        key: Option<Key>,
        pre: Option<Action>,
        post: Option<Action>,
    ) -> Result<(), LifecycleError> {
        if context.is_none() && key.is_none() {
            return Err(ContractViolation::MissingTarget.into());
        }
        if self.in_transition {
            return Err(ContractViolation::ReentrantTransition.into());
        }

        self.in_transition = true;
        let result = self.run_transition(policy, scope, context, key, pre, post);
        self.in_transition = false;
        result
    }

    pub fn switch_to_context(
        &mut self,
        policy: &dyn Policy,
        scope: &mut Scope<'_>,
        context: Context,
        pre: Option<Action>,
        post: Option<Action>,
    ) -> Result<(), LifecycleError> {
        self.switch_to_state(policy, scope, Some(context), None, pre, post)
    }

    pub fn switch_to_key(
        &mut self,
        policy: &dyn Policy,
        scope: &mut Scope<'_>,
        key: Key,
        pre: Option<Action>,
        post: Option<Action>,
    ) -> Result<(), LifecycleError> {
        self.switch_to_state(policy, scope, None, Some(key), pre, post)
    }

    /// Advance to the policy's successor of the current context (the start
    /// context when the machine has not started yet).
    pub fn switch_to_next_context(
        &mut self,
        policy: &dyn Policy,
        scope: &mut Scope<'_>,
        pre: Option<Action>,
        post: Option<Action>,
    ) -> Result<(), LifecycleError> {
        let target = match self.current {
            Some(identity) => policy
                .next_context(identity.context)
                .ok_or(ContractViolation::MissingNextContext {
                    context: identity.context,
                })?,
            None => policy.start_context(),
        };
        self.switch_to_context(policy, scope, target, pre, post)
    }

    fn run_transition(
        &mut self,
        policy: &dyn Policy,
        scope: &mut Scope<'_>,
        context: Option<Context>,
        key: Option<Key>,
        pre: Option<Action>,
        post: Option<Action>,
    ) -> Result<(), LifecycleError> {
        match self.current {
            None => {
                let context = context.ok_or(ContractViolation::InitialWithoutContext)?;
                let key = self.resolve_key(policy, context, key)?;
                let identity = StateIdentity::new(context, key);
                debug!(to = %identity, "initial transition");

                policy.enter_context(context, scope);
                self.current = Some(identity);
                scope.identity = Some(identity);
                if let Some(pre) = pre {
                    pre(scope);
                }
                let state = self.state_for(policy, identity)?;
                state.enter(scope, None);
                self.pending_post = post;
            }
            Some(old) => {
                let context = context.unwrap_or(old.context);
                let key = self.resolve_key(policy, context, key)?;
                let new = StateIdentity::new(context, key);

                if new == old {
                    debug!(at = %new, "stay transition");
                    if let Some(deferred) = self.pending_post.take() {
                        deferred(scope);
                    }
                    if let Some(pre) = pre {
                        pre(scope);
                    }
                    let state = self.state_for(policy, new)?;
                    state.stay(scope);
                    self.pending_post = post;
                } else {
                    debug!(from = %old, to = %new, "transition");
                    let outgoing = self.state_for(policy, old)?;
                    outgoing.exit(scope, new);
                    if let Some(deferred) = self.pending_post.take() {
                        deferred(scope);
                    }
                    if new.context != old.context {
                        policy.exit_context(old.context, scope);
                        policy.enter_context(new.context, scope);
                    }
                    self.current = Some(new);
                    scope.identity = Some(new);
                    if let Some(pre) = pre {
                        pre(scope);
                    }
                    let state = self.state_for(policy, new)?;
                    state.enter(scope, Some(old));
                    self.pending_post = post;
                }
            }
        }

        Ok(())
    }

    fn resolve_key(
        &self,
        policy: &dyn Policy,
        context: Context,
        key: Option<Key>,
    ) -> Result<Key, LifecycleError> {
        match key {
            Some(key) => Ok(key),
            None => policy
                .start_key(context)
                .ok_or_else(|| ContractViolation::MissingStartKey { context }.into()),
        }
    }

    // One memoized state instance per identity for the machine's lifetime.
    fn state_for(
        &mut self,
        policy: &dyn Policy,
        identity: StateIdentity,
    ) -> Result<Arc<dyn State>, LifecycleError> {
        if let Some(state) = self.states.get(&identity) {
            return Ok(Arc::clone(state));
        }
        let state = policy
            .define_state(identity)
            .ok_or(ContractViolation::UnmappedState { identity })?;
        self.states.insert(identity, Arc::clone(&state));
        Ok(state)
    }

    /// Number of distinct states constructed so far.
    pub fn cached_states(&self) -> usize {
        self.states.len()
    }
}
