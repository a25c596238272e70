//! Configuration store, element attributes and resolved component settings.
//!
//! A component's knobs come from two places: a read-mostly global store
//! (loaded from a TOML file, namespaced under `lifecycle`) and the attributes
//! of its backing element. An attribute always overrides the global value.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

use crate::error::ConfigError;

/// Non-owning stand-in for the backing DOM element: a named bag of
/// attributes. Element lifetime is managed by the host, not the component.
#[derive(Debug, Clone, Default)]
pub struct Element {
    attributes: HashMap<String, String>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Shared read-mostly configuration store with dotted-key lookup.
#[derive(Clone, Default)]
pub struct ConfigStore {
    values: Arc<RwLock<Value>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            values: Arc::new(RwLock::new(Value::Object(Default::default()))),
        }
    }

    /// Load a TOML file into a fresh store.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let values: Value = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            values: Arc::new(RwLock::new(values)),
        })
    }

    /// Look up a dotted key (e.g. `lifecycle.delay-rate-ms`).
    pub fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read();
        let mut current = &*values;
        for segment in key.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Set a dotted key, creating intermediate tables as needed.
    pub fn set(&self, key: &str, value: Value) {
        let mut values = self.values.write();
        let mut current = &mut *values;
        let segments: Vec<&str> = key.split('.').collect();
        for segment in &segments[..segments.len() - 1] {
            if !current.get(*segment).map(Value::is_object).unwrap_or(false) {
                current[*segment] = Value::Object(Default::default());
            }
            current = &mut current[*segment];
        }
        current[segments[segments.len() - 1]] = value;
    }

    /// Resolve a setting: element attribute first, then the namespaced
    /// global value under `lifecycle.<name>`, then the default.
    pub fn get_config_or_attribute(
        &self,
        element: Option<&Element>,
        name: &str,
        default: &str,
    ) -> String {
        if let Some(value) = element.and_then(|e| e.get_attribute(name)) {
            return value.to_string();
        }
        match self.get(&format!("lifecycle.{name}")) {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => {
                warn!(key = name, value = %other, "non-scalar config value, using default");
                default.to_string()
            }
            None => default.to_string(),
        }
    }

    /// Millisecond variant of [`get_config_or_attribute`]. Unparseable
    /// values fall back to the default with a warning.
    pub fn get_duration_ms(
        &self,
        element: Option<&Element>,
        name: &str,
        default: Duration,
    ) -> Duration {
        let raw = self.get_config_or_attribute(element, name, &default.as_millis().to_string());
        match raw.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(key = name, value = %raw, "invalid millisecond value, using default");
                default
            }
        }
    }
}

/// Rates and thresholds resolved once per attach.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Poll interval for refresh-forever components.
    pub refresh_rate: Duration,
    /// Wait between retry attempts.
    pub delay_rate: Duration,
    /// Continuous-failure span after which retries promote to transient error.
    pub transient_error_delay: Duration,
    /// Network request timeout.
    pub timeout: Duration,
    /// Watchdog deadline for parameter validation.
    pub validation_timeout: Duration,
    /// URL prefix prepended to every widget path.
    pub url_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_rate: Duration::from_secs(10),
            delay_rate: Duration::from_secs(10),
            transient_error_delay: Duration::from_secs(300),
            timeout: Duration::from_secs(30),
            validation_timeout: Duration::from_secs(30),
            url_prefix: String::new(),
        }
    }
}

impl Settings {
    pub fn resolve(config: &ConfigStore, element: Option<&Element>) -> Self {
        let defaults = Settings::default();
        Self {
            refresh_rate: config.get_duration_ms(element, "refresh-rate-ms", defaults.refresh_rate),
            delay_rate: config.get_duration_ms(element, "delay-rate-ms", defaults.delay_rate),
            transient_error_delay: config.get_duration_ms(
                element,
                "transient-error-delay-ms",
                defaults.transient_error_delay,
            ),
            timeout: config.get_duration_ms(element, "timeout-ms", defaults.timeout),
            validation_timeout: config.get_duration_ms(
                element,
                "validation-timeout-ms",
                defaults.validation_timeout,
            ),
            url_prefix: config.get_config_or_attribute(element, "url-prefix", ""),
        }
    }
}
