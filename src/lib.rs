//! Pulse Lifecycle: State Machines for Polling Dashboard Components
//!
//! A two-dimensional lifecycle runtime for server-backed dashboard widgets.
//! Each component walks a table of (context, key) states under a pluggable
//! [`policy::Policy`], with retry/backoff, parameter validation and
//! publish/subscribe teardown handled by the runtime rather than by each
//! widget.

pub mod bus;
pub mod component;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod machine;
pub mod policy;
pub mod retry;
pub mod state;
pub mod transport;
pub mod types;
pub mod widget;

pub use bus::{EventBus, OwnerId, Signal};
pub use component::{Component, TickEvent};
pub use config::{ConfigStore, Element, Settings};
pub use error::{ConfigError, ContractViolation, LifecycleError};
pub use lifecycle::{AutoPathPolicy, ParamValidationPolicy, PollingPolicy, SingleShotPolicy};
pub use machine::Machine;
pub use policy::Policy;
pub use retry::ErrorPolicy;
pub use state::{Effect, Scope, State, TimerAction, TimerSlot};
pub use transport::{HttpTransport, RequestOutcome, ServerStatus, Transport};
pub use types::{Context, Key, StateIdentity};
pub use widget::{Validation, Widget};
