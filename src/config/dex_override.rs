//! # Dex Override
//!
//! Source of the process-wide `DISABLE_DEX` kill-switch.
//!
//! The reconciler reads the override exactly once per pass through this trait
//! and hands the value to the enablement evaluator, which stays pure. Changing
//! the environment between passes is an ordinary configuration change.

use super::controller::parse_bool_lenient;
use crate::constants::DISABLE_DEX_ENV;
use std::fmt::Debug;

/// Provides the current value of the Dex override
///
/// `Some(true)` disables Dex, `Some(false)` enables it, `None` defers to the
/// custom resource.
pub trait OverrideSource: Send + Sync + Debug {
    fn dex_disabled(&self) -> Option<bool>;
}

/// Reads `DISABLE_DEX` from the process environment on every call
#[derive(Debug, Clone, Default)]
pub struct EnvOverrideSource;

impl OverrideSource for EnvOverrideSource {
    fn dex_disabled(&self) -> Option<bool> {
        std::env::var(DISABLE_DEX_ENV)
            .ok()
            .and_then(|value| parse_bool_lenient(&value))
    }
}

/// Fixed override value, used by tests and by `--disable-dex`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticOverride(pub Option<bool>);

impl OverrideSource for StaticOverride {
    fn dex_disabled(&self) -> Option<bool> {
        self.0
    }
}
