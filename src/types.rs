//! Core lifecycle coordinates: contexts, keys and state identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Macro-phase of a component's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Context {
    Initialization,
    Reset,
    Initialized,
    ParamValidation,
    Load,
    Loaded,
    Reload,
    Normal,
    NotAvailable,
    NotApplicable,
    Stop,
    BeforeDestruction,
}

impl Context {
    pub fn as_str(self) -> &'static str {
        match self {
            Context::Initialization => "initialization",
            Context::Reset => "reset",
            Context::Initialized => "initialized",
            Context::ParamValidation => "param_validation",
            Context::Load => "load",
            Context::Loaded => "loaded",
            Context::Reload => "reload",
            Context::Normal => "normal",
            Context::NotAvailable => "not_available",
            Context::NotApplicable => "not_applicable",
            Context::Stop => "stop",
            Context::BeforeDestruction => "before_destruction",
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Micro-state within a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Initializing,
    Validating,
    Loading,
    Standard,
    Temporary,
    Delay,
    TransientError,
    Error,
}

impl Key {
    pub fn as_str(self) -> &'static str {
        match self {
            Key::Initializing => "initializing",
            Key::Validating => "validating",
            Key::Loading => "loading",
            Key::Standard => "standard",
            Key::Temporary => "temporary",
            Key::Delay => "delay",
            Key::TransientError => "transient_error",
            Key::Error => "error",
        }
    }

    /// Keys that represent an armed retry wait.
    pub fn is_retry(self) -> bool {
        matches!(self, Key::Temporary | Key::Delay | Key::TransientError)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (context, key) pair identifying exactly one state instance per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateIdentity {
    pub context: Context,
    pub key: Key,
}

impl StateIdentity {
    pub fn new(context: Context, key: Key) -> Self {
        Self { context, key }
    }
}

impl fmt::Display for StateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.context, self.key)
    }
}
