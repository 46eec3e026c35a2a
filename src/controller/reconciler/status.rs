//! # Status
//!
//! Builds the `ArgoCD` status for a pass and patches it when it changed.

use crate::constants::OPERATOR_NAME;
use crate::controller::reconciler::enablement::EnablementSignal;
use crate::controller::reconciler::types::{ReconcileOutcome, ReconcilerError};
use crate::crd::{ArgoCD, ArgoCDStatus, Condition};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

pub const PHASE_AVAILABLE: &str = "Available";
pub const PHASE_FAILED: &str = "Failed";
pub const SSO_RUNNING: &str = "Running";
pub const SSO_DISABLED: &str = "Disabled";

/// Status for `cr` after a pass ended with `result`
///
/// `signal` is the enablement decision of the pass; it is known even when
/// the pass failed. `last_transition_time` is carried over when the Ready
/// condition keeps its status.
#[must_use]
pub fn build_status(
    cr: &ArgoCD,
    signal: EnablementSignal,
    result: &Result<ReconcileOutcome, ReconcilerError>,
    now: &str,
) -> ArgoCDStatus {
    let (phase, ready, reason, message) = match result {
        Ok(outcome) => (
            PHASE_AVAILABLE,
            "True",
            "ReconciliationSucceeded".to_string(),
            format!("Dex {}", outcome.signal),
        ),
        Err(e) => (PHASE_FAILED, "False", e.reason().to_string(), e.to_string()),
    };

    let previous = cr
        .status
        .as_ref()
        .and_then(|s| s.conditions.iter().find(|c| c.r#type == "Ready"));
    let last_transition_time = match previous {
        Some(c) if c.status == ready => c.last_transition_time.clone(),
        _ => Some(now.to_string()),
    };

    ArgoCDStatus {
        phase: Some(phase.to_string()),
        sso: Some(if signal.is_enabled() { SSO_RUNNING } else { SSO_DISABLED }.to_string()),
        sso_signal: Some(signal.as_str().to_string()),
        conditions: vec![Condition {
            r#type: "Ready".to_string(),
            status: ready.to_string(),
            last_transition_time,
            reason: Some(reason),
            message: Some(message),
        }],
        observed_generation: cr.metadata.generation,
        last_reconcile_time: Some(now.to_string()),
    }
}

/// Whether `new` differs from `current` in anything but the reconcile timestamp
#[must_use]
pub fn status_changed(current: Option<&ArgoCDStatus>, new: &ArgoCDStatus) -> bool {
    let Some(current) = current else {
        return true;
    };
    let strip = |s: &ArgoCDStatus| ArgoCDStatus {
        last_reconcile_time: None,
        ..s.clone()
    };
    strip(current) != strip(new)
}

/// Patch the status subresource, skipped when nothing changed
pub async fn update_status(
    client: &Client,
    cr: &ArgoCD,
    status: &ArgoCDStatus,
) -> Result<(), ReconcilerError> {
    if !status_changed(cr.status.as_ref(), status) {
        debug!("Skipping status update - status unchanged");
        return Ok(());
    }

    let api: Api<ArgoCD> = Api::namespaced(
        client.clone(),
        cr.metadata.namespace.as_deref().unwrap_or("default"),
    );
    let patch = serde_json::json!({ "status": status });
    api.patch_status(
        &cr.name_any(),
        &PatchParams::apply(OPERATOR_NAME),
        &Patch::Merge(patch),
    )
    .await
    .map_err(ReconcilerError::Status)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> ReconcileOutcome {
        ReconcileOutcome {
            signal: EnablementSignal::EnabledBySsoNestedConfig,
            dex_disabled_override: None,
            dex: vec![],
            ingresses: vec![],
        }
    }

    #[test]
    fn test_success_status() {
        let cr = ArgoCD::new("argocd", Default::default());
        let status = build_status(
            &cr,
            EnablementSignal::EnabledBySsoNestedConfig,
            &Ok(outcome()),
            "2024-01-01T00:00:00Z",
        );
        assert_eq!(status.phase.as_deref(), Some(PHASE_AVAILABLE));
        assert_eq!(status.sso.as_deref(), Some(SSO_RUNNING));
        assert_eq!(status.sso_signal.as_deref(), Some("EnabledBySsoNestedConfig"));
        assert_eq!(status.conditions[0].status, "True");
    }

    #[test]
    fn test_failure_status() {
        let cr = ArgoCD::new("argocd", Default::default());
        let status = build_status(
            &cr,
            EnablementSignal::DisabledByOverride,
            &Err(ReconcilerError::Validation("bad name".to_string())),
            "2024-01-01T00:00:00Z",
        );
        assert_eq!(status.phase.as_deref(), Some(PHASE_FAILED));
        assert_eq!(status.sso.as_deref(), Some(SSO_DISABLED));
        assert_eq!(status.conditions[0].reason.as_deref(), Some("ValidationFailed"));
    }

    #[test]
    fn test_transition_time_kept_and_timestamp_ignored() {
        let mut cr = ArgoCD::new("argocd", Default::default());
        let first = build_status(
            &cr,
            EnablementSignal::DisabledByAbsence,
            &Ok(outcome()),
            "2024-01-01T00:00:00Z",
        );
        cr.status = Some(first.clone());
        let second = build_status(
            &cr,
            EnablementSignal::DisabledByAbsence,
            &Ok(outcome()),
            "2024-01-01T00:05:00Z",
        );
        assert_eq!(
            second.conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert!(!status_changed(Some(&first), &second));
        assert!(status_changed(None, &second));
    }
}
