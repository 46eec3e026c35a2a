//! Dex server Deployment and Service.

use super::common::{
    combine_image_tag, default_node_selector, dex_rbac_name, dex_server_name, object_meta,
    restricted_security_context, LABEL_NAME,
};
use crate::constants::{
    DEFAULT_ARGOCD_IMAGE, DEFAULT_ARGOCD_VERSION, DEFAULT_DEX_IMAGE, DEFAULT_DEX_VERSION,
    DEX_GRPC_PORT, DEX_HTTP_PORT, DEX_LIVENESS_PATH, DEX_METRICS_PORT, DEX_SERVER_COMPONENT,
    DEX_SHARED_MOUNT_PATH, DEX_STATIC_FILES_VOLUME,
};
use crate::controller::reconciler::enablement::DexSettings;
use crate::crd::ArgoCD;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, HTTPGetAction, PodSpec, PodTemplateSpec,
    Probe, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Dex image: nested settings, then legacy settings, then the built-in default
#[must_use]
pub fn dex_image(settings: &DexSettings) -> String {
    combine_image_tag(
        settings.image.as_deref().unwrap_or(DEFAULT_DEX_IMAGE),
        settings.version.as_deref().unwrap_or(DEFAULT_DEX_VERSION),
    )
}

/// Platform image used by the copyutil init container
#[must_use]
pub fn argocd_image(cr: &ArgoCD) -> String {
    let image = cr
        .spec
        .image
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .unwrap_or(DEFAULT_ARGOCD_IMAGE);
    let version = cr
        .spec
        .version
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_ARGOCD_VERSION);
    combine_image_tag(image, version)
}

fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(LABEL_NAME.to_string(), name.to_string())])
}

fn shared_mount() -> Vec<VolumeMount> {
    vec![VolumeMount {
        name: DEX_STATIC_FILES_VOLUME.to_string(),
        mount_path: DEX_SHARED_MOUNT_PATH.to_string(),
        ..Default::default()
    }]
}

fn container_port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        ..Default::default()
    }
}

/// Pod spec of the Dex server
#[must_use]
pub fn dex_pod_spec(cr: &ArgoCD, settings: &DexSettings) -> PodSpec {
    let copyutil = Container {
        name: "copyutil".to_string(),
        image: Some(argocd_image(cr)),
        command: Some(vec![
            "cp".to_string(),
            "-n".to_string(),
            "/usr/local/bin/argocd".to_string(),
            format!("{DEX_SHARED_MOUNT_PATH}/argocd-dex"),
        ]),
        security_context: Some(restricted_security_context()),
        volume_mounts: Some(shared_mount()),
        image_pull_policy: Some("Always".to_string()),
        resources: settings.resources.clone(),
        ..Default::default()
    };

    let dex = Container {
        name: "dex".to_string(),
        image: Some(dex_image(settings)),
        command: Some(vec![
            format!("{DEX_SHARED_MOUNT_PATH}/argocd-dex"),
            "rundex".to_string(),
        ]),
        env: (!settings.env.is_empty()).then(|| settings.env.clone()),
        liveness_probe: Some(Probe {
            http_get: Some(HTTPGetAction {
                path: Some(DEX_LIVENESS_PATH.to_string()),
                port: IntOrString::Int(DEX_METRICS_PORT),
                ..Default::default()
            }),
            initial_delay_seconds: Some(60),
            period_seconds: Some(30),
            ..Default::default()
        }),
        ports: Some(vec![
            container_port("http", DEX_HTTP_PORT),
            container_port("grpc", DEX_GRPC_PORT),
            container_port("metrics", DEX_METRICS_PORT),
        ]),
        security_context: Some(restricted_security_context()),
        volume_mounts: Some(shared_mount()),
        resources: settings.resources.clone(),
        ..Default::default()
    };

    PodSpec {
        volumes: Some(vec![Volume {
            name: DEX_STATIC_FILES_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }]),
        init_containers: Some(vec![copyutil]),
        containers: vec![dex],
        service_account_name: Some(dex_rbac_name(cr)),
        node_selector: Some(default_node_selector()),
        ..Default::default()
    }
}

#[must_use]
pub fn dex_deployment(cr: &ArgoCD, settings: &DexSettings) -> Deployment {
    let name = dex_server_name(cr);
    Deployment {
        metadata: object_meta(cr, &name, DEX_SERVER_COMPONENT),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels(&name)),
                    ..Default::default()
                }),
                spec: Some(dex_pod_spec(cr, settings)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        protocol: Some("TCP".to_string()),
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
    }
}

#[must_use]
pub fn dex_service(cr: &ArgoCD) -> Service {
    let name = dex_server_name(cr);
    Service {
        metadata: object_meta(cr, &name, DEX_SERVER_COMPONENT),
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(&name)),
            ports: Some(vec![
                service_port("http", DEX_HTTP_PORT),
                service_port("grpc", DEX_GRPC_PORT),
                service_port("metrics", DEX_METRICS_PORT),
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
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
    fn test_default_images() {
        assert_eq!(dex_image(&DexSettings::default()), "ghcr.io/dexidp/dex:v2.37.0");
        assert_eq!(argocd_image(&cr()), "quay.io/argoproj/argocd:v2.8.4");
    }

    #[test]
    fn test_platform_image_from_spec() {
        let mut cr = cr();
        cr.spec.image = Some("registry.local/argocd".to_string());
        cr.spec.version = Some("sha256:deadbeef".to_string());
        assert_eq!(argocd_image(&cr), "registry.local/argocd@sha256:deadbeef");
    }

    #[test]
    fn test_deployment_selector_matches_template() {
        let deployment = dex_deployment(&cr(), &DexSettings::default());
        let spec = deployment.spec.unwrap();
        assert_eq!(
            spec.selector.match_labels,
            spec.template.metadata.and_then(|m| m.labels)
        );
    }

    #[test]
    fn test_service_selects_deployment() {
        let svc = dex_service(&cr());
        let selector = svc.spec.and_then(|s| s.selector).unwrap();
        assert_eq!(selector.get(LABEL_NAME).map(String::as_str), Some("argocd-dex-server"));
    }
}
