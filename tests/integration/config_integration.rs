//! Config file loading and the attribute > config > default precedence.

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use pulse_lifecycle::{ConfigStore, Element, EventBus, RequestOutcome, Settings, SingleShotPolicy};

use super::test_utils::{build_with, RecordingWidget, ScriptedTransport};

#[test]
fn settings_come_from_a_toml_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_file = temp_dir.path().join("pulse.toml");
    std::fs::write(
        &config_file,
        r#"
[lifecycle]
refresh-rate-ms = 5000
delay-rate-ms = 2000
url-prefix = "/pulse/api"
"#,
    )?;

    let config = ConfigStore::load_file(&config_file)?;

    let settings = Settings::resolve(&config, None);
    assert_eq!(settings.refresh_rate, Duration::from_millis(5000));
    assert_eq!(settings.delay_rate, Duration::from_millis(2000));
    assert_eq!(settings.url_prefix, "/pulse/api");
    // Untouched keys keep their defaults.
    assert_eq!(settings.transient_error_delay, Duration::from_secs(300));
    Ok(())
}

#[test]
fn element_attributes_override_the_config_file() {
    let config = ConfigStore::new();
    config.set("lifecycle.refresh-rate-ms", json!(5000));

    let element = Element::new().with_attribute("refresh-rate-ms", "2500");
    let settings = Settings::resolve(&config, Some(&element));
    assert_eq!(settings.refresh_rate, Duration::from_millis(2500));

    let settings = Settings::resolve(&config, Some(&Element::new()));
    assert_eq!(settings.refresh_rate, Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn component_requests_use_the_configured_url_prefix() {
    let config = ConfigStore::new();
    config.set("lifecycle.url-prefix", json!("/pulse/api"));

    let transport = ScriptedTransport::new(vec![RequestOutcome::Success(json!({}))]);
    let mut component = build_with(
        SingleShotPolicy::new(),
        RecordingWidget::new(),
        transport.clone(),
        EventBus::default(),
        config,
    );
    component.connect(Element::new()).unwrap();
    component.tick().await.unwrap();

    assert_eq!(transport.requests(), vec!["/pulse/api/status".to_string()]);
}
