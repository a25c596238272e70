//! Policy seam: context tables, state factories and phase progression.
//!
//! The machine is parameterized by a `Policy` instead of subclassed; layered
//! behavior (validation phase, auto-path) wraps an inner policy as a
//! decorator. `validate_policy` walks the complete context table at
//! construction time so an unmapped (context, key) fails before the
//! component ever starts.

use std::sync::Arc;

use crate::error::{ContractViolation, LifecycleError};
use crate::state::{Scope, State};
use crate::types::{Context, Key, StateIdentity};

pub trait Policy: Send + Sync {
    /// Context entered by the very first `start()`.
    fn start_context(&self) -> Context;

    /// Key a context resolves to when a transition names no key.
    fn start_key(&self, context: Context) -> Option<Key>;

    /// Successor context, if this context has one.
    fn next_context(&self, context: Context) -> Option<Context>;

    /// Abstract state factory. Returning `None` for a reachable identity is
    /// a contract violation caught by [`validate_policy`].
    fn define_state(&self, identity: StateIdentity) -> Option<Arc<dyn State>>;

    /// Every context the policy can reach, with the keys valid inside it.
    fn context_table(&self) -> Vec<(Context, Vec<Key>)>;

    /// Fired when the active context actually changes, never on a
    /// same-context key change.
    fn enter_context(&self, context: Context, scope: &mut Scope<'_>) {
        let _ = (context, scope);
    }

    fn exit_context(&self, context: Context, scope: &mut Scope<'_>) {
        let _ = (context, scope);
    }

    /// Whether a non-empty path must be resolved before URLs can be built.
    fn requires_path(&self) -> bool {
        false
    }
}

/// Check the whole context table up front: every listed identity has a
/// state, every start key is listed, every successor is a known context.
pub fn validate_policy(policy: &dyn Policy) -> Result<(), LifecycleError> {
    let table = policy.context_table();
    let known: Vec<Context> = table.iter().map(|(context, _)| *context).collect();

    if !known.contains(&policy.start_context()) {
        return Err(ContractViolation::UnknownContext {
            context: policy.start_context(),
        }
        .into());
    }

    for (context, keys) in &table {
        let start = policy
            .start_key(*context)
            .ok_or(ContractViolation::MissingStartKey { context: *context })?;
        if !keys.contains(&start) {
            return Err(ContractViolation::UnmappedState {
                identity: StateIdentity::new(*context, start),
            }
            .into());
        }

        for key in keys {
            let identity = StateIdentity::new(*context, *key);
            policy
                .define_state(identity)
                .ok_or(ContractViolation::UnmappedState { identity })?;
        }

        if let Some(next) = policy.next_context(*context) {
            if !known.contains(&next) {
                return Err(ContractViolation::UnknownContext { context: next }.into());
            }
        }
    }

    Ok(())
}
