//! Teardown, detach retention and reattachment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use pulse_lifecycle::{
    ConfigStore, Context, Element, EventBus, Key, LifecycleError, PollingPolicy, RequestOutcome,
    Signal, SingleShotPolicy, StateIdentity, TimerSlot,
};

use super::test_utils::{build, build_with, RecordingWidget, ScriptedTransport};

#[tokio::test(start_paused = true)]
async fn destroy_unsubscribes_and_halts() {
    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(json!({}))]);
    let bus = EventBus::default();
    let mut component = build_with(
        SingleShotPolicy::new(),
        RecordingWidget::new(),
        transport,
        bus.clone(),
        ConfigStore::new(),
    );

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    component.add_listener(
        Signal::MaintenanceBanner,
        None,
        Arc::new(move |_signal, _payload| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();
    assert_eq!(bus.dispatch_to_all(Signal::MaintenanceBanner, &json!({})), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    component.destroy().unwrap();
    assert_eq!(
        component.current(),
        Some(StateIdentity::new(Context::BeforeDestruction, Key::Standard))
    );
    assert!(component.is_destroyed());
    assert_eq!(bus.dispatch_to_all(Signal::MaintenanceBanner, &json!({})), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Idempotent.
    component.destroy().unwrap();
    assert!(component.is_destroyed());
}

#[tokio::test(start_paused = true)]
async fn destroyed_components_reject_further_operations() {
    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(json!({}))]);
    let mut component = build(SingleShotPolicy::new(), RecordingWidget::new(), transport);
    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();
    component.destroy().unwrap();

    assert!(matches!(
        component.reload(),
        Err(LifecycleError::Destroyed)
    ));
}

#[tokio::test(start_paused = true)]
async fn destroy_cancels_timers_and_the_inflight_request() {
    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(json!({}))]);
    let mut component = build(PollingPolicy::new(), RecordingWidget::new(), transport);
    component.connect(Element::new()).unwrap();
    assert!(component.has_request_in_flight());

    component.destroy().unwrap();
    assert!(!component.has_request_in_flight());
    assert!(!component.is_timer_armed(TimerSlot::Poll));
    assert!(!component.is_timer_armed(TimerSlot::Retry));
}

#[tokio::test(start_paused = true)]
async fn reattach_after_destroy_restarts_through_reset() {
    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(json!({"rev": 1}))]);
    let mut component = build(
        SingleShotPolicy::new(),
        RecordingWidget::new(),
        transport.clone(),
    );
    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();
    component.destroy().unwrap();

    transport.push(RequestOutcome::Success(json!({"rev": 2})));
    component.connect(Element::new()).unwrap();
    assert!(!component.is_destroyed());
    assert_eq!(
        component.current(),
        Some(StateIdentity::new(Context::Load, Key::Loading))
    );
    assert_eq!(component.widget().initialized, 2);

    component.tick().await.unwrap();
    assert_eq!(component.widget().refreshed.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn detach_with_retention_preserves_the_exact_state() {
    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(json!({}))]);
    let mut component = build(
        PollingPolicy::new(),
        RecordingWidget::new(),
        transport,
    )
    .retain_state_on_detach(true);

    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();
    let parked = component.current();
    assert!(component.is_timer_armed(TimerSlot::Poll));

    component.disconnect().unwrap();
    assert!(!component.is_connected());
    assert!(!component.is_destroyed());
    assert_eq!(component.current(), parked);
    assert!(component.is_timer_armed(TimerSlot::Poll));

    component.connect(Element::new()).unwrap();
    assert_eq!(component.current(), parked);
    assert_eq!(component.widget().initialized, 1);
}

#[tokio::test(start_paused = true)]
async fn detach_without_retention_tears_down() {
    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(json!({}))]);
    let mut component = build(SingleShotPolicy::new(), RecordingWidget::new(), transport);
    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();

    component.disconnect().unwrap();
    assert!(component.is_destroyed());
    assert_eq!(
        component.current(),
        Some(StateIdentity::new(Context::BeforeDestruction, Key::Standard))
    );
}
