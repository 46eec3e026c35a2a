//! # ArgoCD Spec
//!
//! Main CRD specification type.

use serde::{Deserialize, Serialize};

/// ArgoCD Custom Resource Definition
///
/// Describes the desired state of one platform instance. This operator acts on
/// the SSO, legacy Dex and ingress portions of the spec.
///
/// # Example
///
/// ```yaml
/// apiVersion: argoproj.io/v1alpha1
/// kind: ArgoCD
/// metadata:
///   name: argocd
///   namespace: argocd
/// spec:
///   sso:
///     provider: dex
///     dex:
///       openShiftOAuth: true
///   server:
///     ingress:
///       enabled: true
///       ingressClassName: nginx
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "ArgoCD",
    group = "argoproj.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::ArgoCDStatus",
    shortname = "acd",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"SSO", "type":"string", "jsonPath":".status.sso"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSpec {
    /// Platform container image, shared by components that copy the argocd binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Platform image tag (or digest)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Legacy Dex configuration
    ///
    /// Deprecated in favour of `.spec.sso.dex`. Still honoured: with no `.spec.sso`
    /// block, `openShiftOAuth: true` (or a non-empty `config`) enables Dex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex: Option<crate::crd::ArgoCDDexSpec>,
    /// Single sign-on provider selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso: Option<crate::crd::ArgoCDSSOSpec>,
    /// API server options (ingress for HTTP and gRPC)
    #[serde(default)]
    pub server: crate::crd::ArgoCDServerSpec,
    #[serde(default)]
    pub grafana: crate::crd::ArgoCDGrafanaSpec,
    #[serde(default)]
    pub prometheus: crate::crd::ArgoCDPrometheusSpec,
    /// ApplicationSet controller options; `None` means the controller is not deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_set: Option<crate::crd::ArgoCDApplicationSet>,
}
