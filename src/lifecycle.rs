//! Layered lifecycle policies.
//!
//! Two base flows, load-once and refresh-forever, plus decorators that
//! insert a parameter-validation phase and an auto-resolved path
//! requirement. Decorators wrap an inner policy instead of subclassing it,
//! so each layer is independently testable.

pub mod auto_path;
pub mod polling;
pub mod single_shot;
pub mod validation;

pub use auto_path::AutoPathPolicy;
pub use polling::PollingPolicy;
pub use single_shot::SingleShotPolicy;
pub use validation::ParamValidationPolicy;
