//! Deferred post-actions must fire exactly once, in submission order, at
//! the start of the following transition, no matter how the transition
//! sequence mixes context flips, key changes and same-identity re-entries.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::Value;

use pulse_lifecycle::state::{Action, Effects, Scope, State};
use pulse_lifecycle::{Context, Key, Machine, Policy, Settings, StateIdentity, Widget};

struct NullWidget;

impl Widget for NullWidget {
    fn short_url(&self) -> String {
        String::new()
    }

    fn refresh(&mut self, _data: &Value) {}
}

struct QuietState;

impl State for QuietState {
    fn enter(&self, _scope: &mut Scope<'_>, _from: Option<StateIdentity>) {}
}

struct TwoContextPolicy;

impl Policy for TwoContextPolicy {
    fn start_context(&self) -> Context {
        Context::Normal
    }

    fn start_key(&self, context: Context) -> Option<Key> {
        match context {
            Context::Normal | Context::NotAvailable | Context::Stop => Some(Key::Standard),
            _ => None,
        }
    }

    fn next_context(&self, context: Context) -> Option<Context> {
        match context {
            Context::Normal => Some(Context::NotAvailable),
            Context::NotAvailable => Some(Context::Normal),
            _ => None,
        }
    }

    fn define_state(&self, identity: StateIdentity) -> Option<Arc<dyn State>> {
        self.start_key(identity.context)?;
        Some(Arc::new(QuietState))
    }

    fn context_table(&self) -> Vec<(Context, Vec<Key>)> {
        vec![
            (Context::Normal, vec![Key::Standard, Key::Loading]),
            (Context::NotAvailable, vec![Key::Standard, Key::Loading]),
            (Context::Stop, vec![Key::Standard]),
        ]
    }
}

/// One scripted transition: flip the context or not, pick one of two keys.
#[derive(Debug, Clone, Copy)]
struct Step {
    flip_context: bool,
    loading_key: bool,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    (any::<bool>(), any::<bool>()).prop_map(|(flip_context, loading_key)| Step {
        flip_context,
        loading_key,
    })
}

proptest! {
    #[test]
    fn post_actions_fire_exactly_once_in_order(
        steps in proptest::collection::vec(step_strategy(), 1..40)
    ) {
        let log: Arc<Mutex<Vec<usize>>> = Arc::default();
        let policy = TwoContextPolicy;
        let mut machine = Machine::new();
        let mut widget = NullWidget;
        let settings = Settings::default();
        let mut effects = Effects::default();

        for (index, step) in steps.iter().enumerate() {
            let context = match machine.current() {
                None => Some(Context::Normal),
                Some(identity) if step.flip_context => Some(match identity.context {
                    Context::Normal => Context::NotAvailable,
                    _ => Context::Normal,
                }),
                Some(_) => None,
            };
            let key = Some(if step.loading_key {
                Key::Loading
            } else {
                Key::Standard
            });
            let recorder = Arc::clone(&log);
            let post: Action = Box::new(move |_scope: &mut Scope<'_>| {
                recorder.lock().unwrap().push(index);
            });

            let mut scope = Scope {
                identity: machine.current(),
                widget: &mut widget,
                settings: &settings,
                effects: &mut effects,
            };
            machine
                .switch_to_state(&policy, &mut scope, context, key, None, Some(post))
                .unwrap();

            // Every earlier post has fired exactly once, in submission
            // order; this step's post is still pending.
            let fired = log.lock().unwrap().clone();
            prop_assert_eq!(fired, (0..index).collect::<Vec<_>>());
            prop_assert!(machine.has_pending_post());
        }

        // A closing transition flushes the last pending post.
        let mut scope = Scope {
            identity: machine.current(),
            widget: &mut widget,
            settings: &settings,
            effects: &mut effects,
        };
        machine
            .switch_to_state(&policy, &mut scope, Some(Context::Stop), None, None, None)
            .unwrap();
        let fired = log.lock().unwrap().clone();
        prop_assert_eq!(fired, (0..steps.len()).collect::<Vec<_>>());
        prop_assert!(!machine.has_pending_post());
    }
}
