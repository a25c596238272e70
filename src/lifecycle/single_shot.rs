//! Load-once flow: fetch one payload, display it, stay put.
//!
//! `Reload` lets a caller force one more fetch without unmounting the
//! last-good render.

use std::sync::Arc;

use crate::policy::Policy;
use crate::state::{ErrorState, HaltState, IdleState, RequestState, RetryState, State};
use crate::types::{Context, Key, StateIdentity};

const REQUEST_KEYS: [Key; 5] = [
    Key::Loading,
    Key::Temporary,
    Key::Delay,
    Key::TransientError,
    Key::Error,
];

#[derive(Default)]
pub struct SingleShotPolicy;

impl SingleShotPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Policy for SingleShotPolicy {
    fn start_context(&self) -> Context {
        Context::Initialization
    }

    fn start_key(&self, context: Context) -> Option<Key> {
        match context {
            Context::Initialization | Context::Reset => Some(Key::Initializing),
            Context::Load | Context::Reload => Some(Key::Loading),
            Context::Loaded
            | Context::Stop
            | Context::NotApplicable
            | Context::BeforeDestruction => Some(Key::Standard),
            _ => None,
        }
    }

    fn next_context(&self, context: Context) -> Option<Context> {
        match context {
            Context::Initialization | Context::Reset => Some(Context::Load),
            Context::Load | Context::Reload => Some(Context::Loaded),
            _ => None,
        }
    }

    fn define_state(&self, identity: StateIdentity) -> Option<Arc<dyn State>> {
        match (identity.context, identity.key) {
            (Context::Initialization | Context::Reset, Key::Initializing) => {
                Some(Arc::new(IdleState))
            }
            (Context::Load | Context::Reload, Key::Loading) => {
                Some(Arc::new(RequestState::single_shot()))
            }
            (Context::Load | Context::Reload, Key::Temporary | Key::Delay | Key::TransientError) => {
                Some(Arc::new(RetryState))
            }
            (Context::Load | Context::Reload, Key::Error) => Some(Arc::new(ErrorState)),
            (Context::Loaded, Key::Standard) => Some(Arc::new(IdleState)),
            (Context::Stop | Context::NotApplicable | Context::BeforeDestruction, Key::Standard) => {
                Some(Arc::new(HaltState))
            }
            _ => None,
        }
    }

    fn context_table(&self) -> Vec<(Context, Vec<Key>)> {
        vec![
            (Context::Initialization, vec![Key::Initializing]),
            (Context::Reset, vec![Key::Initializing]),
            (Context::Load, REQUEST_KEYS.to_vec()),
            (Context::Reload, REQUEST_KEYS.to_vec()),
            (Context::Loaded, vec![Key::Standard]),
            (Context::Stop, vec![Key::Standard]),
            (Context::NotApplicable, vec![Key::Standard]),
            (Context::BeforeDestruction, vec![Key::Standard]),
        ]
    }
}
