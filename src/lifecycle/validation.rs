//! Parameter-validation decorator.
//!
//! Inserts a `ParamValidation` context between the initialization phase and
//! the inner policy's request phase. Its `Validating` key is a watchdog
//! state: a fixed-deadline timer force-fails to `Error` if the widget's
//! validation never resolves.

use std::sync::Arc;

use crate::policy::Policy;
use crate::state::{ErrorState, Scope, State, ValidatingState};
use crate::types::{Context, Key, StateIdentity};

pub struct ParamValidationPolicy<P> {
    inner: P,
}

impl<P: Policy> ParamValidationPolicy<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Policy> Policy for ParamValidationPolicy<P> {
    fn start_context(&self) -> Context {
        self.inner.start_context()
    }

    fn start_key(&self, context: Context) -> Option<Key> {
        match context {
            Context::ParamValidation => Some(Key::Validating),
            other => self.inner.start_key(other),
        }
    }

    fn next_context(&self, context: Context) -> Option<Context> {
        match context {
            // Validation slips in between init/reset and the request phase.
            Context::Initialization | Context::Reset => Some(Context::ParamValidation),
            Context::ParamValidation => self.inner.next_context(Context::Initialization),
            other => self.inner.next_context(other),
        }
    }

    fn define_state(&self, identity: StateIdentity) -> Option<Arc<dyn State>> {
        match (identity.context, identity.key) {
            (Context::ParamValidation, Key::Validating) => Some(Arc::new(ValidatingState)),
            (Context::ParamValidation, Key::Error) => Some(Arc::new(ErrorState)),
            _ => self.inner.define_state(identity),
        }
    }

    fn context_table(&self) -> Vec<(Context, Vec<Key>)> {
        let mut table = self.inner.context_table();
        table.push((Context::ParamValidation, vec![Key::Validating, Key::Error]));
        table
    }

    fn enter_context(&self, context: Context, scope: &mut Scope<'_>) {
        self.inner.enter_context(context, scope);
    }

    fn exit_context(&self, context: Context, scope: &mut Scope<'_>) {
        self.inner.exit_context(context, scope);
    }

    fn requires_path(&self) -> bool {
        self.inner.requires_path()
    }
}
