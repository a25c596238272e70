//! Wire-level decisions observed end to end through a component.

use serde_json::json;

use pulse_lifecycle::{Element, Key, RequestOutcome, ServerStatus, SingleShotPolicy};

use super::test_utils::{build, RecordingWidget, ScriptedTransport};

#[test]
fn maintenance_uses_its_wire_name() {
    assert_eq!(
        ServerStatus::parse("PulseMaintenance"),
        ServerStatus::Maintenance
    );
    assert_eq!(ServerStatus::Maintenance.as_str(), "PulseMaintenance");
}

#[tokio::test(start_paused = true)]
async fn unknown_status_strings_are_fatal() {
    let transport = ScriptedTransport::new(vec![RequestOutcome::Error {
        status: ServerStatus::Unknown("SomethingNew".to_string()),
        message: None,
    }]);
    let mut component = build(SingleShotPolicy::new(), RecordingWidget::new(), transport);
    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();

    assert_eq!(component.current().unwrap().key, Key::Error);
    assert!(!component.widget().errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn widget_error_hook_overrides_the_policy_table() {
    struct TolerantWidget(RecordingWidget);

    // ProcessingDelay is normally retry-with-delay; this widget treats it
    // as not applicable for its view.
    impl pulse_lifecycle::Widget for TolerantWidget {
        fn short_url(&self) -> String {
            self.0.short_url()
        }

        fn refresh(&mut self, data: &serde_json::Value) {
            self.0.refresh(data);
        }

        fn manage_error_status(
            &mut self,
            status: &ServerStatus,
            _message: &str,
        ) -> Option<pulse_lifecycle::ErrorPolicy> {
            (*status == ServerStatus::ProcessingDelay)
                .then_some(pulse_lifecycle::ErrorPolicy::NotApplicable)
        }
    }

    let transport = ScriptedTransport::new(vec![RequestOutcome::Error {
        status: ServerStatus::ProcessingDelay,
        message: None,
    }]);
    let mut component = pulse_lifecycle::Component::new(
        TolerantWidget(RecordingWidget::new()),
        SingleShotPolicy::new(),
        pulse_lifecycle::EventBus::default(),
        pulse_lifecycle::ConfigStore::new(),
        transport,
    )
    .unwrap();
    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();

    assert_eq!(
        component.current(),
        Some(pulse_lifecycle::StateIdentity::new(
            pulse_lifecycle::Context::NotApplicable,
            Key::Standard
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn queued_success_data_reaches_the_widget_verbatim() {
    let payload = json!({"Values": [1, 2, 3], "Unit": "rpm"});
    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(payload.clone())]);
    let mut component = build(
        SingleShotPolicy::new(),
        RecordingWidget::new(),
        transport,
    );
    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();

    assert_eq!(component.widget().refreshed, vec![payload]);
}
