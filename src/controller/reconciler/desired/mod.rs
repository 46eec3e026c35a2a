//! # Desired State
//!
//! Pure builders for every object the operator manages. Identical input
//! always yields identical output; nothing here talks to the cluster.
//!
//! - `common`: names, labels, owner references, image references
//! - `dex`: Dex Deployment and Service
//! - `rbac`: Dex ServiceAccount, Role and RoleBinding
//! - `ingress`: component ingresses
//! - `validation`: checks run on built objects before any write

pub mod common;
pub mod dex;
pub mod ingress;
pub mod rbac;
pub mod validation;

pub use common::{combine_image_tag, dex_rbac_name, dex_server_name};
pub use dex::{argocd_image, dex_deployment, dex_image, dex_pod_spec, dex_service};
pub use ingress::{desired_ingress, ingress_targets, IngressTarget};
pub use rbac::{dex_policy_rules, dex_role, dex_role_binding, dex_service_account};

use crate::controller::reconciler::enablement::DexSettings;
use crate::crd::ArgoCD;
use crate::store::{ManagedObject, ManagedObjectKind, ObjectKey};
use kube::ResourceExt;

/// Dex object kinds in the order they are reconciled
pub const DEX_OBJECT_ORDER: [ManagedObjectKind; 5] = [
    ManagedObjectKind::ServiceAccount,
    ManagedObjectKind::Role,
    ManagedObjectKind::RoleBinding,
    ManagedObjectKind::Service,
    ManagedObjectKind::Deployment,
];

/// Key of the Dex object of `kind` owned by `cr`
#[must_use]
pub fn dex_object_key(cr: &ArgoCD, kind: ManagedObjectKind) -> ObjectKey {
    let name = match kind {
        ManagedObjectKind::Deployment | ManagedObjectKind::Service => dex_server_name(cr),
        _ => dex_rbac_name(cr),
    };
    ObjectKey::new(kind, cr.namespace().unwrap_or_default(), name)
}

/// Desired Dex object of `kind`
///
/// Returns `None` for kinds that are not part of the Dex component.
#[must_use]
pub fn desired_dex_object(
    cr: &ArgoCD,
    settings: &DexSettings,
    kind: ManagedObjectKind,
) -> Option<ManagedObject> {
    Some(match kind {
        ManagedObjectKind::ServiceAccount => dex_service_account(cr).into(),
        ManagedObjectKind::Role => dex_role(cr).into(),
        ManagedObjectKind::RoleBinding => dex_role_binding(cr).into(),
        ManagedObjectKind::Service => dex_service(cr).into(),
        ManagedObjectKind::Deployment => dex_deployment(cr, settings).into(),
        ManagedObjectKind::Ingress => return None,
    })
}

/// Every desired Dex object, in reconcile order
#[must_use]
pub fn desired_dex_objects(cr: &ArgoCD, settings: &DexSettings) -> Vec<ManagedObject> {
    DEX_OBJECT_ORDER
        .iter()
        .filter_map(|kind| desired_dex_object(cr, settings, *kind))
        .collect()
}
