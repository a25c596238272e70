//! Refresh-forever flow: `Normal` loops on a poll timer.

use std::sync::Arc;

use crate::policy::Policy;
use crate::state::{
    ErrorState, HaltState, IdleState, NotAvailableState, RequestState, RetryState, State,
};
use crate::types::{Context, Key, StateIdentity};

const REQUEST_KEYS: [Key; 5] = [
    Key::Loading,
    Key::Temporary,
    Key::Delay,
    Key::TransientError,
    Key::Error,
];

#[derive(Default)]
pub struct PollingPolicy;

impl PollingPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Policy for PollingPolicy {
    fn start_context(&self) -> Context {
        Context::Initialization
    }

    fn start_key(&self, context: Context) -> Option<Key> {
        match context {
            Context::Initialization | Context::Reset => Some(Key::Initializing),
            Context::Normal => Some(Key::Loading),
            Context::NotAvailable
            | Context::Stop
            | Context::NotApplicable
            | Context::BeforeDestruction => Some(Key::Standard),
            _ => None,
        }
    }

    fn next_context(&self, context: Context) -> Option<Context> {
        match context {
            Context::Initialization | Context::Reset => Some(Context::Normal),
            // The polling loop: success re-enters Normal forever.
            Context::Normal => Some(Context::Normal),
            Context::NotAvailable => Some(Context::Normal),
            _ => None,
        }
    }

    fn define_state(&self, identity: StateIdentity) -> Option<Arc<dyn State>> {
        match (identity.context, identity.key) {
            (Context::Initialization | Context::Reset, Key::Initializing) => {
                Some(Arc::new(IdleState))
            }
            (Context::Normal, Key::Loading) => Some(Arc::new(RequestState::polling())),
            (Context::Normal, Key::Temporary | Key::Delay | Key::TransientError) => {
                Some(Arc::new(RetryState))
            }
            (Context::Normal, Key::Error) => Some(Arc::new(ErrorState)),
            (Context::NotAvailable, Key::Standard) => {
                Some(Arc::new(NotAvailableState::new(Context::Normal)))
            }
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
            (Context::Normal, REQUEST_KEYS.to_vec()),
            (Context::NotAvailable, vec![Key::Standard]),
            (Context::Stop, vec![Key::Standard]),
            (Context::NotApplicable, vec![Key::Standard]),
            (Context::BeforeDestruction, vec![Key::Standard]),
        ]
    }
}
