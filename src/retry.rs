//! Error classification and retry/backoff policy.
//!
//! One table drives both the single-shot and the polling layers; the only
//! layer-specific difference is which context the `Loading` key lives in.

use std::time::Duration;

use tokio::time::Instant;
use tracing::error;

use crate::bus::Signal;
use crate::transport::ServerStatus;
use crate::types::Key;

/// What to do about one observed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Broadcast a login signal and retry with delay.
    RefreshAuth,
    /// Broadcast the support banner and stop in the `Error` key.
    Fatal,
    /// Permanent "does not apply here": enter the `NotApplicable` context.
    NotApplicable,
    /// Re-enter loading after `delay_rate` via the `Delay` key.
    RetryWithDelay,
    /// Re-enter loading after `delay_rate` via the `Temporary` key.
    RetryImmediately,
    /// Broadcast a system banner; fatal unless the widget opted into
    /// continued polling.
    SystemBanner(Signal),
}

/// The retry-policy table for application statuses.
pub fn classify(status: &ServerStatus) -> ErrorPolicy {
    match status {
        ServerStatus::AuthorizationError => ErrorPolicy::RefreshAuth,
        ServerStatus::MissingConfiguration
        | ServerStatus::WrongRequestParameter
        | ServerStatus::UnexpectedError => ErrorPolicy::Fatal,
        ServerStatus::NotApplicable => ErrorPolicy::NotApplicable,
        ServerStatus::ProcessingDelay => ErrorPolicy::RetryWithDelay,
        ServerStatus::TransientProcessError | ServerStatus::Stale => ErrorPolicy::RetryImmediately,
        ServerStatus::DatabaseConnectionError => ErrorPolicy::SystemBanner(Signal::DatabaseDown),
        ServerStatus::Maintenance => ErrorPolicy::SystemBanner(Signal::MaintenanceBanner),
        ServerStatus::Unknown(raw) => {
            error!(status = %raw, "unrecognized server status, treating as fatal");
            ErrorPolicy::Fatal
        }
    }
}

/// Transport failures: timeouts and gateway-class statuses are recoverable,
/// everything else is fatal.
pub fn classify_failure(timeout: bool, http_status: Option<u16>) -> ErrorPolicy {
    if timeout || matches!(http_status, None | Some(0) | Some(500) | Some(504)) {
        ErrorPolicy::RetryWithDelay
    } else {
        ErrorPolicy::Fatal
    }
}

/// Resolve the retry key for the next attempt.
///
/// Promotion to `TransientError` is time-based: once the span since the
/// first consecutive failure reaches `transient_error_delay`, every further
/// retry uses `TransientError` no matter how many attempts occurred. A
/// component already showing `TransientError` never regresses to
/// `Temporary`/`Delay` while failures continue.
pub fn retry_key(
    base: Key,
    current: Option<Key>,
    first_failure: Instant,
    now: Instant,
    transient_error_delay: Duration,
) -> Key {
    debug_assert!(base == Key::Temporary || base == Key::Delay);
    if current == Some(Key::TransientError) {
        return Key::TransientError;
    }
    if now.saturating_duration_since(first_failure) >= transient_error_delay {
        return Key::TransientError;
    }
    base
}
