//! Error types for the lifecycle runtime.

use crate::types::{Context, StateIdentity};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for '{key}': {detail}")]
    InvalidValue { key: String, detail: String },

    #[error("Invalid log directive: {0}")]
    InvalidLogDirective(String),
}

/// Broken policy or widget contracts. These indicate programming errors and
/// are never retried.
#[derive(Debug, Error)]
pub enum ContractViolation {
    #[error("switch_to_state called without a context or a key")]
    MissingTarget,

    #[error("initial transition requires a context")]
    InitialWithoutContext,

    #[error("no state defined for {identity}")]
    UnmappedState { identity: StateIdentity },

    #[error("no start key for context {context}")]
    MissingStartKey { context: Context },

    #[error("no next context from {context}")]
    MissingNextContext { context: Context },

    #[error("context {context} is not in the policy table")]
    UnknownContext { context: Context },

    #[error("transition started while another transition is running")]
    ReentrantTransition,

    #[error("resolved path is empty after successful validation")]
    EmptyPath,
}

/// Top-level error for lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Component is not connected to an element")]
    NotConnected,

    #[error("Component has been destroyed")]
    Destroyed,
}
