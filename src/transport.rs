//! Network collaborator: the `Transport` trait, wire statuses and the
//! default reqwest-backed adapter.
//!
//! The lifecycle core only sees the three-way outcome of a request; how the
//! bytes move is the adapter's business. At most one request is in flight per
//! component at any time (enforced by the component runtime).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Application-level status reported by the server in an error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    AuthorizationError,
    MissingConfiguration,
    WrongRequestParameter,
    UnexpectedError,
    NotApplicable,
    ProcessingDelay,
    TransientProcessError,
    Stale,
    DatabaseConnectionError,
    Maintenance,
    /// Status string this crate does not know. Treated as a contract
    /// violation by the retry layer.
    Unknown(String),
}

impl ServerStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "AuthorizationError" => ServerStatus::AuthorizationError,
            "MissingConfiguration" => ServerStatus::MissingConfiguration,
            "WrongRequestParameter" => ServerStatus::WrongRequestParameter,
            "UnexpectedError" => ServerStatus::UnexpectedError,
            "NotApplicable" => ServerStatus::NotApplicable,
            "ProcessingDelay" => ServerStatus::ProcessingDelay,
            "TransientProcessError" => ServerStatus::TransientProcessError,
            "Stale" => ServerStatus::Stale,
            "DatabaseConnectionError" => ServerStatus::DatabaseConnectionError,
            "PulseMaintenance" => ServerStatus::Maintenance,
            other => ServerStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServerStatus::AuthorizationError => "AuthorizationError",
            ServerStatus::MissingConfiguration => "MissingConfiguration",
            ServerStatus::WrongRequestParameter => "WrongRequestParameter",
            ServerStatus::UnexpectedError => "UnexpectedError",
            ServerStatus::NotApplicable => "NotApplicable",
            ServerStatus::ProcessingDelay => "ProcessingDelay",
            ServerStatus::TransientProcessError => "TransientProcessError",
            ServerStatus::Stale => "Stale",
            ServerStatus::DatabaseConnectionError => "DatabaseConnectionError",
            ServerStatus::Maintenance => "PulseMaintenance",
            ServerStatus::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-way outcome of one request cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// 2xx with a data payload.
    Success(Value),
    /// 2xx with an application error payload (`Status` / `ErrorMessage`).
    Error {
        status: ServerStatus,
        message: Option<String>,
    },
    /// Transport-level failure: timeout, connection error or HTTP error
    /// status. `http_status` is `None` when no response was received.
    Failure {
        timeout: bool,
        http_status: Option<u16>,
    },
}

/// Network collaborator consumed by the component runtime.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn issue(&self, url: &str, timeout: Duration) -> RequestOutcome;
}

/// Decode a 2xx JSON body: a `Status` field marks an application error
/// payload, anything else is success data.
pub fn decode_payload(body: Value) -> RequestOutcome {
    if let Some(raw) = body.get("Status").and_then(Value::as_str) {
        let status = ServerStatus::parse(raw);
        let message = body
            .get("ErrorMessage")
            .and_then(Value::as_str)
            .map(str::to_string);
        return RequestOutcome::Error { status, message };
    }
    RequestOutcome::Success(body)
}

/// Default HTTP transport over reqwest.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue(&self, url: &str, timeout: Duration) -> RequestOutcome {
        debug!(url, timeout_ms = timeout.as_millis() as u64, "issuing request");
        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(err) => {
                return RequestOutcome::Failure {
                    timeout: err.is_timeout(),
                    http_status: err.status().map(|s| s.as_u16()),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return RequestOutcome::Failure {
                timeout: false,
                http_status: Some(status.as_u16()),
            };
        }

        match response.json::<Value>().await {
            Ok(body) => decode_payload(body),
            Err(err) => RequestOutcome::Failure {
                timeout: err.is_timeout(),
                http_status: None,
            },
        }
    }
}
