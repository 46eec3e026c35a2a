//! # Ingress Configuration
//!
//! Per-component ingress settings for the API server, its gRPC endpoint,
//! Grafana, Prometheus and the ApplicationSet webhook.

use k8s_openapi::api::networking::v1::IngressTLS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ingress options shared by every exposed component
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDIngressSpec {
    /// Create the Ingress object
    #[serde(default)]
    pub enabled: bool,
    /// IngressClass to use; left unset on the object when not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,
    /// Extra annotations, merged over the operator defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    /// HTTP path (default `/`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// TLS configuration; defaults to the host with the `argocd-secret` certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Vec<IngressTLS>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDServerGRPCSpec {
    /// Hostname of the gRPC ingress (default `<name>-grpc`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub ingress: ArgoCDIngressSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDServerSpec {
    /// Hostname of the server ingress (default `<name>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub ingress: ArgoCDIngressSpec,
    #[serde(default)]
    pub grpc: ArgoCDServerGRPCSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDGrafanaSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub ingress: ArgoCDIngressSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDPrometheusSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub ingress: ArgoCDIngressSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookServerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub ingress: ArgoCDIngressSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDApplicationSet {
    #[serde(default)]
    pub webhook_server: WebhookServerSpec,
}
