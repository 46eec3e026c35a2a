//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `argocd_sso_reconciliations_total` - Total number of reconciliations
//! - `argocd_sso_reconciliation_errors_total` - Total number of reconciliation errors
//! - `argocd_sso_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `argocd_sso_object_operations_total` - Writes to managed objects by kind and transition
//! - `argocd_sso_dex_enabled` - Dex enablement per custom resource (1 enabled, 0 disabled)
//! - `argocd_sso_dex_override` - Current `DISABLE_DEX` value (-1 unset, 0 false, 1 true)
//! - `argocd_sso_requeues_total` - Requeues by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "argocd_sso_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "argocd_sso_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "argocd_sso_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static OBJECT_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "argocd_sso_object_operations_total",
            "Total number of writes to managed objects",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create OBJECT_OPERATIONS_TOTAL metric - this should never happen")
});

static DEX_ENABLED: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "argocd_sso_dex_enabled",
            "Whether Dex is enabled for a custom resource (1 enabled, 0 disabled)",
        ),
        &["namespace", "name"],
    )
    .expect("Failed to create DEX_ENABLED metric - this should never happen")
});

static DEX_OVERRIDE: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "argocd_sso_dex_override",
        "Value of the DISABLE_DEX override (-1 unset, 0 false, 1 true)",
    )
    .expect("Failed to create DEX_OVERRIDE metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("argocd_sso_requeues_total", "Total number of requeues"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(OBJECT_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEX_ENABLED.clone()))?;
    REGISTRY.register(Box::new(DEX_OVERRIDE.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn record_object_operation(kind: &str, operation: &str) {
    OBJECT_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn set_dex_enabled(namespace: &str, name: &str, enabled: bool) {
    DEX_ENABLED
        .with_label_values(&[namespace, name])
        .set(i64::from(enabled));
}

pub fn set_dex_override(value: Option<bool>) {
    DEX_OVERRIDE.set(value.map_or(-1, i64::from));
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_gauge_encoding() {
        set_dex_override(None);
        assert_eq!(DEX_OVERRIDE.get(), -1);
        set_dex_override(Some(true));
        assert_eq!(DEX_OVERRIDE.get(), 1);
        set_dex_override(Some(false));
        assert_eq!(DEX_OVERRIDE.get(), 0);
    }

    #[test]
    fn test_object_operation_counter() {
        let before = OBJECT_OPERATIONS_TOTAL
            .with_label_values(&["Role", "created"])
            .get();
        record_object_operation("Role", "created");
        assert_eq!(
            OBJECT_OPERATIONS_TOTAL
                .with_label_values(&["Role", "created"])
                .get(),
            before + 1
        );
    }
}
