//! Widget override points.
//!
//! Concrete widgets implement rendering and parameter handling; the runtime
//! drives everything else. Defaults are deliberate: a minimal widget only
//! supplies `short_url` and `refresh`.

use std::time::Duration;

use serde_json::Value;

use crate::config::{Element, Settings};
use crate::retry::ErrorPolicy;
use crate::transport::ServerStatus;

/// Outcome of parameter validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Parameters are valid; the component may advance to the request phase.
    Ok,
    /// A required parameter is missing or malformed. Never auto-retried.
    Invalid(String),
    /// Validation completes later via `Component::resolve_validation`; the
    /// watchdog force-fails it if nothing arrives in time.
    Pending,
}

pub trait Widget {
    /// Widget-specific URL tail appended to the configured prefix (and the
    /// resolved path, for auto-path components).
    fn short_url(&self) -> String;

    /// Render hook. Runs strictly after the machine has already advanced,
    /// so the widget may assume its new context/key is current.
    fn refresh(&mut self, data: &Value);

    /// One-time setup on attach (bus subscriptions, attribute parsing).
    fn initialize(&mut self, element: Option<&Element>) {
        let _ = element;
    }

    /// Check required attributes before any request is issued.
    fn validate_parameters(&mut self, element: Option<&Element>) -> Validation {
        let _ = element;
        Validation::Ok
    }

    fn display_error(&mut self, message: &str) {
        let _ = message;
    }

    fn remove_error(&mut self) {}

    /// Extension hook consulted before the built-in retry table. Return
    /// `Some` to override the policy for a status.
    fn manage_error_status(&mut self, status: &ServerStatus, message: &str) -> Option<ErrorPolicy> {
        let _ = (status, message);
        None
    }

    fn refresh_rate(&self, settings: &Settings) -> Duration {
        settings.refresh_rate
    }

    fn timeout(&self, settings: &Settings) -> Duration {
        settings.timeout
    }

    fn transient_error_delay(&self, settings: &Settings) -> Duration {
        settings.transient_error_delay
    }

    /// System-status widgets keep polling through database/maintenance
    /// outages instead of entering `Error`.
    fn keeps_polling_on_system_error(&self) -> bool {
        false
    }
}
