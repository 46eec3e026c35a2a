//! Shared pieces of every desired object: names, labels, owner references,
//! image references and the container security context.

use crate::constants::{
    ARGOCD_PREFIX, DEFAULT_NODE_SELECTOR_KEY, DEFAULT_NODE_SELECTOR_VALUE, DEX_SERVER_COMPONENT,
    OPERATOR_NAME, PART_OF,
};
use crate::crd::ArgoCD;
use k8s_openapi::api::core::v1::{Capabilities, SecurityContext};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// `<cr>-<suffix>`
#[must_use]
pub fn name_with_suffix(cr: &ArgoCD, suffix: &str) -> String {
    format!("{}-{}", cr.name_any(), suffix)
}

/// Deployment and Service name of the Dex server
#[must_use]
pub fn dex_server_name(cr: &ArgoCD) -> String {
    name_with_suffix(cr, DEX_SERVER_COMPONENT)
}

/// ServiceAccount, Role and RoleBinding name of the Dex server
#[must_use]
pub fn dex_rbac_name(cr: &ArgoCD) -> String {
    format!("{}-{}-{}", cr.name_any(), ARGOCD_PREFIX, DEX_SERVER_COMPONENT)
}

#[must_use]
pub fn common_labels(name: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), name.to_string()),
        (LABEL_PART_OF.to_string(), PART_OF.to_string()),
        (LABEL_COMPONENT.to_string(), component.to_string()),
        (LABEL_MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
    ])
}

/// Controller owner reference back to the custom resource
///
/// `None` when the resource has not been persisted yet (no uid).
#[must_use]
pub fn owner_reference(cr: &ArgoCD) -> Option<OwnerReference> {
    cr.controller_owner_ref(&())
}

/// Metadata for an object owned by `cr` in its namespace
#[must_use]
pub fn object_meta(cr: &ArgoCD, name: &str, component: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: cr.namespace(),
        labels: Some(common_labels(name, component)),
        owner_references: owner_reference(cr).map(|owner| vec![owner]),
        ..Default::default()
    }
}

/// Join an image and a tag; a tag containing `:` is treated as a digest
#[must_use]
pub fn combine_image_tag(image: &str, tag: &str) -> String {
    if tag.contains(':') {
        format!("{image}@{tag}")
    } else if tag.is_empty() {
        image.to_string()
    } else {
        format!("{image}:{tag}")
    }
}

/// Container security context applied to every managed container
#[must_use]
pub fn restricted_security_context() -> SecurityContext {
    SecurityContext {
        allow_privilege_escalation: Some(false),
        capabilities: Some(Capabilities {
            drop: Some(vec!["ALL".to_string()]),
            ..Default::default()
        }),
        run_as_non_root: Some(true),
        ..Default::default()
    }
}

#[must_use]
pub fn default_node_selector() -> BTreeMap<String, String> {
    BTreeMap::from([(
        DEFAULT_NODE_SELECTOR_KEY.to_string(),
        DEFAULT_NODE_SELECTOR_VALUE.to_string(),
    )])
}
