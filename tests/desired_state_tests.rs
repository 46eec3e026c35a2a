//! Desired Dex objects built from custom resources

mod common;

use argocd_sso_operator::controller::reconciler::desired::{
    desired_dex_objects, dex_deployment, dex_pod_spec, dex_role, dex_service,
};
use argocd_sso_operator::controller::reconciler::DexSettings;
use argocd_sso_operator::crd::{ArgoCDDexSpec, ArgoCDSSOSpec, ArgoCDSpec, SsoProviderType};
use argocd_sso_operator::store::ManagedObjectKind;
use common::*;
use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

fn resources() -> ResourceRequirements {
    ResourceRequirements {
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("500m".to_string())),
            ("memory".to_string(), Quantity("256Mi".to_string())),
        ])),
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity("250m".to_string())),
            ("memory".to_string(), Quantity("128Mi".to_string())),
        ])),
        ..Default::default()
    }
}

#[test]
fn test_dex_pod_spec_layout() {
    let cr = make_test_argocd(sso_dex_spec(ArgoCDDexSpec::default()));
    let pod = dex_pod_spec(&cr, &DexSettings::resolve(&cr.spec));

    let init = &pod.init_containers.as_ref().expect("init containers")[0];
    assert_eq!(init.name, "copyutil");
    assert_eq!(init.image.as_deref(), Some("quay.io/argoproj/argocd:v2.8.4"));
    assert_eq!(
        init.command.as_deref(),
        Some(
            &[
                "cp".to_string(),
                "-n".to_string(),
                "/usr/local/bin/argocd".to_string(),
                "/shared/argocd-dex".to_string(),
            ][..]
        )
    );
    assert_eq!(init.image_pull_policy.as_deref(), Some("Always"));

    assert_eq!(pod.containers.len(), 1);
    let dex = &pod.containers[0];
    assert_eq!(dex.name, "dex");
    assert_eq!(dex.image.as_deref(), Some("ghcr.io/dexidp/dex:v2.37.0"));
    assert_eq!(
        dex.command.as_deref(),
        Some(&["/shared/argocd-dex".to_string(), "rundex".to_string()][..])
    );
    assert!(dex.env.is_none());

    let ports: Vec<(Option<&str>, i32)> = dex
        .ports
        .as_ref()
        .expect("ports")
        .iter()
        .map(|p| (p.name.as_deref(), p.container_port))
        .collect();
    assert_eq!(
        ports,
        vec![(Some("http"), 5556), (Some("grpc"), 5557), (Some("metrics"), 5558)]
    );

    let probe = dex.liveness_probe.as_ref().expect("liveness probe");
    let http_get = probe.http_get.as_ref().expect("http probe");
    assert_eq!(http_get.path.as_deref(), Some("/healthz/live"));
    assert_eq!(http_get.port, IntOrString::Int(5558));
    assert_eq!(probe.initial_delay_seconds, Some(60));
    assert_eq!(probe.period_seconds, Some(30));

    let security = dex.security_context.as_ref().expect("security context");
    assert_eq!(security.allow_privilege_escalation, Some(false));
    assert_eq!(security.run_as_non_root, Some(true));
    assert_eq!(
        security.capabilities.as_ref().and_then(|c| c.drop.clone()),
        Some(vec!["ALL".to_string()])
    );

    let volumes = pod.volumes.as_ref().expect("volumes");
    assert_eq!(volumes[0].name, "static-files");
    assert!(volumes[0].empty_dir.is_some());
    assert_eq!(pod.service_account_name.as_deref(), Some("argocd-argocd-dex-server"));
    assert_eq!(
        pod.node_selector
            .as_ref()
            .and_then(|n| n.get("kubernetes.io/os"))
            .map(String::as_str),
        Some("linux")
    );
}

#[test]
fn test_resources_and_env_apply_to_both_containers() {
    let cr = make_test_argocd(sso_dex_spec(ArgoCDDexSpec {
        resources: Some(resources()),
        env: Some(vec![EnvVar {
            name: "DEX_LOG_LEVEL".to_string(),
            value: Some("debug".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    }));
    let pod = dex_pod_spec(&cr, &DexSettings::resolve(&cr.spec));

    let init = &pod.init_containers.as_ref().expect("init containers")[0];
    assert_eq!(init.resources, Some(resources()));
    assert_eq!(pod.containers[0].resources, Some(resources()));

    let env = pod.containers[0].env.as_ref().expect("env");
    assert_eq!(env.len(), 1);
    assert_eq!(env[0].name, "DEX_LOG_LEVEL");
}

#[test]
fn test_nested_settings_win_over_legacy() {
    let cr = make_test_argocd(ArgoCDSpec {
        dex: Some(ArgoCDDexSpec {
            image: Some("legacy.local/dex".to_string()),
            version: Some("v1".to_string()),
            resources: Some(resources()),
            ..Default::default()
        }),
        sso: Some(ArgoCDSSOSpec {
            provider: Some(SsoProviderType::Dex),
            dex: Some(ArgoCDDexSpec {
                image: Some("nested.local/dex".to_string()),
                ..Default::default()
            }),
        }),
        ..Default::default()
    });
    let settings = DexSettings::resolve(&cr.spec);
    let pod = dex_pod_spec(&cr, &settings);

    // image from the nested block, version and resources fall back to legacy
    assert_eq!(pod.containers[0].image.as_deref(), Some("nested.local/dex:v1"));
    assert_eq!(pod.containers[0].resources, Some(resources()));
}

#[test]
fn test_digest_version_uses_at_separator() {
    let cr = make_test_argocd(sso_dex_spec(ArgoCDDexSpec {
        version: Some("sha256:0123abcd".to_string()),
        ..Default::default()
    }));
    let pod = dex_pod_spec(&cr, &DexSettings::resolve(&cr.spec));
    assert_eq!(
        pod.containers[0].image.as_deref(),
        Some("ghcr.io/dexidp/dex@sha256:0123abcd")
    );
}

#[test]
fn test_deployment_and_service_shape() {
    let cr = make_test_argocd(legacy_dex_spec());
    let settings = DexSettings::resolve(&cr.spec);

    let deployment = dex_deployment(&cr, &settings);
    assert_eq!(deployment.metadata.name.as_deref(), Some("argocd-dex-server"));
    assert_eq!(deployment.metadata.namespace.as_deref(), Some(NAMESPACE));
    let spec = deployment.spec.expect("deployment spec");
    assert_eq!(spec.replicas, Some(1));
    assert_eq!(
        spec.selector.match_labels,
        Some(BTreeMap::from([(
            "app.kubernetes.io/name".to_string(),
            "argocd-dex-server".to_string()
        )]))
    );

    let service = dex_service(&cr);
    let ports: Vec<(Option<String>, i32)> = service
        .spec
        .and_then(|s| s.ports)
        .expect("service ports")
        .into_iter()
        .map(|p| (p.name, p.port))
        .collect();
    assert_eq!(
        ports,
        vec![
            (Some("http".to_string()), 5556),
            (Some("grpc".to_string()), 5557),
            (Some("metrics".to_string()), 5558),
        ]
    );
}

#[test]
fn test_role_grants_secret_and_configmap_reads() {
    let cr = make_test_argocd(legacy_dex_spec());
    let role = dex_role(&cr);
    let rules = role.rules.expect("rules");
    let resources: Vec<String> = rules
        .iter()
        .flat_map(|r| r.resources.clone().unwrap_or_default())
        .collect();
    assert!(resources.contains(&"secrets".to_string()));
    assert!(resources.contains(&"configmaps".to_string()));
}

#[test]
fn test_desired_objects_are_deterministic_and_ordered() {
    let cr = make_test_argocd(sso_dex_spec(ArgoCDDexSpec::default()));
    let settings = DexSettings::resolve(&cr.spec);

    let first = desired_dex_objects(&cr, &settings);
    let second = desired_dex_objects(&cr, &settings);
    assert_eq!(first, second);

    let kinds: Vec<ManagedObjectKind> = first.iter().map(|o| o.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ManagedObjectKind::ServiceAccount,
            ManagedObjectKind::Role,
            ManagedObjectKind::RoleBinding,
            ManagedObjectKind::Service,
            ManagedObjectKind::Deployment,
        ]
    );
}
