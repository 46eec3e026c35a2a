//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables
/// or the matching command-line flags of the operator binary.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Namespace the operator runs in
    pub controller_namespace: String,
    /// Restrict the watch to one namespace (all namespaces when unset)
    pub watch_namespace: Option<String>,
    /// Requeue interval after a successful pass (seconds)
    pub reconcile_interval_secs: u64,
    /// Error backoff floor (seconds)
    pub backoff_min_secs: u64,
    /// Error backoff ceiling (seconds)
    pub backoff_max_secs: u64,
    /// Global log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            controller_namespace: "argocd-operator-system".to_string(),
            watch_namespace: None,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            controller_namespace: env_var_or_default_str("POD_NAMESPACE", "argocd-operator-system"),
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
            reconcile_interval_secs: env_var_or_default(
                "RECONCILE_INTERVAL_SECS",
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            log_level: env_var_or_default_str("LOG_LEVEL", "info"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
        }
    }

    /// Get the requeue duration used after a successful pass
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

/// Parse a boolean the way Go's `strconv.ParseBool` does
///
/// Returns `None` for anything that is not a recognised spelling, so callers
/// can treat garbage the same as an unset value.
pub fn parse_bool_lenient(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_lenient_true_spellings() {
        for value in ["1", "t", "T", "TRUE", "true", "True", " true "] {
            assert_eq!(parse_bool_lenient(value), Some(true), "value {value:?}");
        }
    }

    #[test]
    fn test_parse_bool_lenient_false_spellings() {
        for value in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool_lenient(value), Some(false), "value {value:?}");
        }
    }

    #[test]
    fn test_parse_bool_lenient_rejects_garbage() {
        for value in ["", "yes", "no", "tRuE", "enabled", "2"] {
            assert_eq!(parse_bool_lenient(value), None, "value {value:?}");
        }
    }

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.metrics_port, crate::constants::DEFAULT_METRICS_PORT);
        assert!(config.watch_namespace.is_none());
        assert_eq!(config.reconcile_interval(), Duration::from_secs(300));
    }
}
