//! # Configuration
//!
//! - `controller`: environment-driven controller settings
//! - `dex_override`: the injected `DISABLE_DEX` override source

mod controller;
mod dex_override;

pub use controller::{parse_bool_lenient, ControllerConfig};
pub use dex_override::{EnvOverrideSource, OverrideSource, StaticOverride};
