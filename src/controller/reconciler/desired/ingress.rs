//! Ingress objects for the platform's externally reachable components.
//!
//! Each exposed component is described by an [`IngressTarget`]; the builder
//! turns an enabled target into a networking/v1 Ingress and a disabled one
//! into `None`.

use super::common::{name_with_suffix, object_meta};
use crate::constants::{
    APPLICATION_SET_SUFFIX, GRAFANA_SUFFIX, GRPC_SUFFIX, PROMETHEUS_OPERATED_SERVICE,
    PROMETHEUS_SUFFIX, SERVER_SUFFIX,
};
use crate::crd::{ArgoCD, ArgoCDIngressSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// TLS secret served by the platform when no TLS block is given
pub const DEFAULT_TLS_SECRET: &str = "argocd-secret";

/// An exposed component
#[derive(Debug, Clone, PartialEq)]
pub struct IngressTarget {
    /// Ingress object name
    pub name: String,
    /// `app.kubernetes.io/component` of the ingress
    pub component: &'static str,
    /// Whether the component asks for an Ingress
    pub enabled: bool,
    pub host: String,
    pub backend_service: String,
    pub backend_port: &'static str,
    pub default_annotations: BTreeMap<String, String>,
    pub spec: ArgoCDIngressSpec,
}

fn nginx_annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (format!("nginx.ingress.kubernetes.io/{k}"), (*v).to_string()))
        .collect()
}

fn host_or(host: Option<&String>, default: String) -> String {
    host.filter(|h| !h.trim().is_empty())
        .cloned()
        .unwrap_or(default)
}

/// Every ingress the operator manages for `cr`, in processing order
#[must_use]
pub fn ingress_targets(cr: &ArgoCD) -> Vec<IngressTarget> {
    let spec = &cr.spec;
    let server_service = name_with_suffix(cr, SERVER_SUFFIX);
    let appset = spec.application_set.clone().unwrap_or_default();

    vec![
        IngressTarget {
            name: name_with_suffix(cr, SERVER_SUFFIX),
            component: "server",
            enabled: spec.server.ingress.enabled,
            host: host_or(spec.server.host.as_ref(), cr.name_any()),
            backend_service: server_service.clone(),
            backend_port: "http",
            default_annotations: nginx_annotations(&[
                ("force-ssl-redirect", "true"),
                ("ssl-passthrough", "true"),
            ]),
            spec: spec.server.ingress.clone(),
        },
        IngressTarget {
            name: name_with_suffix(cr, GRPC_SUFFIX),
            component: "server",
            enabled: spec.server.grpc.ingress.enabled,
            host: host_or(
                spec.server.grpc.host.as_ref(),
                name_with_suffix(cr, GRPC_SUFFIX),
            ),
            backend_service: server_service,
            backend_port: "https",
            default_annotations: nginx_annotations(&[("backend-protocol", "GRPC")]),
            spec: spec.server.grpc.ingress.clone(),
        },
        IngressTarget {
            name: name_with_suffix(cr, GRAFANA_SUFFIX),
            component: GRAFANA_SUFFIX,
            enabled: spec.grafana.enabled && spec.grafana.ingress.enabled,
            host: host_or(spec.grafana.host.as_ref(), name_with_suffix(cr, GRAFANA_SUFFIX)),
            backend_service: name_with_suffix(cr, GRAFANA_SUFFIX),
            backend_port: "http",
            default_annotations: nginx_annotations(&[("force-ssl-redirect", "true")]),
            spec: spec.grafana.ingress.clone(),
        },
        IngressTarget {
            name: name_with_suffix(cr, PROMETHEUS_SUFFIX),
            component: PROMETHEUS_SUFFIX,
            enabled: spec.prometheus.enabled && spec.prometheus.ingress.enabled,
            host: host_or(
                spec.prometheus.host.as_ref(),
                name_with_suffix(cr, PROMETHEUS_SUFFIX),
            ),
            backend_service: PROMETHEUS_OPERATED_SERVICE.to_string(),
            backend_port: "web",
            default_annotations: nginx_annotations(&[("force-ssl-redirect", "true")]),
            spec: spec.prometheus.ingress.clone(),
        },
        IngressTarget {
            name: name_with_suffix(cr, APPLICATION_SET_SUFFIX),
            component: APPLICATION_SET_SUFFIX,
            enabled: spec.application_set.is_some() && appset.webhook_server.ingress.enabled,
            host: host_or(
                appset.webhook_server.host.as_ref(),
                name_with_suffix(cr, APPLICATION_SET_SUFFIX),
            ),
            backend_service: name_with_suffix(cr, APPLICATION_SET_SUFFIX),
            backend_port: "webhook",
            default_annotations: nginx_annotations(&[("force-ssl-redirect", "true")]),
            spec: appset.webhook_server.ingress,
        },
    ]
}

/// Desired Ingress for `target`, or `None` when the target is disabled
#[must_use]
pub fn desired_ingress(cr: &ArgoCD, target: &IngressTarget) -> Option<Ingress> {
    if !target.enabled {
        return None;
    }

    let mut meta = object_meta(cr, &target.name, target.component);
    let mut annotations = target.default_annotations.clone();
    if let Some(extra) = &target.spec.annotations {
        annotations.extend(extra.clone());
    }
    meta.annotations = Some(annotations);

    let path = target
        .spec
        .path
        .clone()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "/".to_string());

    let tls = target.spec.tls.clone().unwrap_or_else(|| {
        vec![IngressTLS {
            hosts: Some(vec![target.host.clone()]),
            secret_name: Some(DEFAULT_TLS_SECRET.to_string()),
            ..Default::default()
        }]
    });

    Some(Ingress {
        metadata: meta,
        spec: Some(IngressSpec {
            ingress_class_name: target.spec.ingress_class_name.clone(),
            rules: Some(vec![IngressRule {
                host: Some(target.host.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(path),
                        path_type: "ImplementationSpecific".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: target.backend_service.clone(),
                                port: Some(ServiceBackendPort {
                                    name: Some(target.backend_port.to_string()),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls: Some(tls),
            ..Default::default()
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cr() -> ArgoCD {
        let mut cr = ArgoCD::new("argocd", Default::default());
        cr.metadata.namespace = Some("argocd".to_string());
        cr
    }

    #[test]
    fn test_target_names() {
        let names: Vec<String> = ingress_targets(&cr()).into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "argocd-server",
                "argocd-grpc",
                "argocd-grafana",
                "argocd-prometheus",
                "argocd-applicationset-controller",
            ]
        );
    }

    #[test]
    fn test_disabled_target_builds_nothing() {
        let cr = cr();
        for target in ingress_targets(&cr) {
            assert!(desired_ingress(&cr, &target).is_none(), "{}", target.name);
        }
    }

    #[test]
    fn test_user_annotations_override_defaults() {
        let mut cr = cr();
        cr.spec.server.ingress.enabled = true;
        cr.spec.server.ingress.annotations = Some(BTreeMap::from([(
            "nginx.ingress.kubernetes.io/ssl-passthrough".to_string(),
            "false".to_string(),
        )]));
        let target = ingress_targets(&cr).remove(0);
        let ingress = desired_ingress(&cr, &target).unwrap();
        let annotations = ingress.metadata.annotations.unwrap();
        assert_eq!(
            annotations
                .get("nginx.ingress.kubernetes.io/ssl-passthrough")
                .map(String::as_str),
            Some("false")
        );
        assert_eq!(
            annotations
                .get("nginx.ingress.kubernetes.io/force-ssl-redirect")
                .map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_grafana_needs_component_enabled() {
        let mut cr = cr();
        cr.spec.grafana.ingress.enabled = true;
        let grafana = ingress_targets(&cr).remove(2);
        assert!(!grafana.enabled);
        cr.spec.grafana.enabled = true;
        let grafana = ingress_targets(&cr).remove(2);
        assert!(grafana.enabled);
    }
}
