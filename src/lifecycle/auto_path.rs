//! Auto-path decorator: the component must resolve a non-empty URL path
//! from configuration or an element attribute before any request can be
//! built. Resolution happens during the validation phase, so this wraps a
//! validation-layered policy; failure to resolve folds into the same
//! watchdog failure path.

use std::sync::Arc;

use crate::policy::Policy;
use crate::state::{Scope, State};
use crate::types::{Context, Key, StateIdentity};

pub struct AutoPathPolicy<P> {
    inner: P,
}

impl<P: Policy> AutoPathPolicy<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: Policy> Policy for AutoPathPolicy<P> {
    fn start_context(&self) -> Context {
        self.inner.start_context()
    }

    fn start_key(&self, context: Context) -> Option<Key> {
        self.inner.start_key(context)
    }

    fn next_context(&self, context: Context) -> Option<Context> {
        self.inner.next_context(context)
    }

    fn define_state(&self, identity: StateIdentity) -> Option<Arc<dyn State>> {
        self.inner.define_state(identity)
    }

    fn context_table(&self) -> Vec<(Context, Vec<Key>)> {
        self.inner.context_table()
    }

    fn enter_context(&self, context: Context, scope: &mut Scope<'_>) {
        self.inner.enter_context(context, scope);
    }

    fn exit_context(&self, context: Context, scope: &mut Scope<'_>) {
        self.inner.exit_context(context, scope);
    }

    fn requires_path(&self) -> bool {
        true
    }
}
