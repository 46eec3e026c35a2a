//! Common test utilities for the reconciliation tests
//!
//! Fixtures for `ArgoCD` resources and a helper that runs one pass against an
//! in-memory object store.

#![allow(dead_code)]

use argocd_sso_operator::controller::reconciler::{reconcile_argocd, ReconcileOutcome, ReconcilerError};
use argocd_sso_operator::crd::{ArgoCD, ArgoCDDexSpec, ArgoCDSSOSpec, ArgoCDSpec, SsoProviderType};
use argocd_sso_operator::store::{InMemoryObjectStore, ManagedObjectKind, ObjectKey};
use tokio_util::sync::CancellationToken;

pub const NAME: &str = "argocd";
pub const NAMESPACE: &str = "argocd";

/// An `ArgoCD` resource named `argocd` in namespace `argocd` with a uid set
pub fn make_test_argocd(spec: ArgoCDSpec) -> ArgoCD {
    let mut cr = ArgoCD::new(NAME, spec);
    cr.metadata.namespace = Some(NAMESPACE.to_string());
    cr.metadata.uid = Some("0f6a5b1e-2c1d-4d7e-9a55-3c9f1b2e7a10".to_string());
    cr
}

/// `.spec.sso` with provider dex and a nested dex block
pub fn sso_dex_spec(dex: ArgoCDDexSpec) -> ArgoCDSpec {
    ArgoCDSpec {
        sso: Some(ArgoCDSSOSpec {
            provider: Some(SsoProviderType::Dex),
            dex: Some(dex),
        }),
        ..Default::default()
    }
}

/// Legacy `.spec.dex` with `openShiftOAuth: true`, no SSO block
pub fn legacy_dex_spec() -> ArgoCDSpec {
    ArgoCDSpec {
        dex: Some(ArgoCDDexSpec {
            open_shift_oauth: true,
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn key(kind: ManagedObjectKind, name: &str) -> ObjectKey {
    ObjectKey::new(kind, NAMESPACE, name)
}

/// Keys of the five Dex objects for the fixture resource
pub fn dex_keys() -> Vec<ObjectKey> {
    vec![
        key(ManagedObjectKind::ServiceAccount, "argocd-argocd-dex-server"),
        key(ManagedObjectKind::Role, "argocd-argocd-dex-server"),
        key(ManagedObjectKind::RoleBinding, "argocd-argocd-dex-server"),
        key(ManagedObjectKind::Service, "argocd-dex-server"),
        key(ManagedObjectKind::Deployment, "argocd-dex-server"),
    ]
}

/// Run one pass with a fresh, uncancelled token
pub async fn run_pass(
    cr: &ArgoCD,
    store: &InMemoryObjectStore,
    dex_disabled: Option<bool>,
) -> Result<ReconcileOutcome, ReconcilerError> {
    reconcile_argocd(cr, store, dex_disabled, &CancellationToken::new()).await
}
