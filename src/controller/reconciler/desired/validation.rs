//! Validation of built objects before anything is written.

use crate::crd::ArgoCD;
use crate::store::{ManagedObject, ManagedObjectKind};
use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of a DNS-1123 label (Service names)
const DNS1123_LABEL_MAX: usize = 63;

/// Maximum length of a DNS-1123 subdomain (most other object names)
const DNS1123_SUBDOMAIN_MAX: usize = 253;

// RFC 1123 subdomain: dot-separated labels
static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("Failed to compile DNS1123_SUBDOMAIN regex - this should never happen")
});

// RFC 1123 label
static DNS1123_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$")
        .expect("Failed to compile DNS1123_LABEL regex - this should never happen")
});

/// Check a DNS-1123 subdomain: dot-separated labels of lowercase
/// alphanumerics and `-`, each starting and ending with an alphanumeric
pub fn validate_dns1123_subdomain(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    if value.len() > DNS1123_SUBDOMAIN_MAX {
        return Err(format!("must be no more than {DNS1123_SUBDOMAIN_MAX} characters"));
    }
    if !DNS1123_SUBDOMAIN.is_match(value) {
        return Err(
            "must be a valid DNS-1123 subdomain (lowercase alphanumeric, '-' and '.'; each segment starts and ends with an alphanumeric)"
                .to_string(),
        );
    }
    Ok(())
}

/// Check a DNS-1123 label: at most 63 characters, no dots
pub fn validate_dns1123_label(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    if value.len() > DNS1123_LABEL_MAX {
        return Err(format!("must be no more than {DNS1123_LABEL_MAX} characters"));
    }
    if !DNS1123_LABEL.is_match(value) {
        return Err(
            "must be a valid DNS-1123 label (lowercase alphanumeric and '-'; starts and ends with an alphanumeric)"
                .to_string(),
        );
    }
    Ok(())
}

/// The custom resource must be addressable before anything is derived from it
pub fn validate_custom_resource(cr: &ArgoCD) -> Result<(), String> {
    let name = cr
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| "custom resource has no name".to_string())?;
    validate_dns1123_subdomain(name).map_err(|e| format!("custom resource name {name:?} {e}"))?;
    match cr.metadata.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => Ok(()),
        _ => Err(format!("custom resource {name} has no namespace")),
    }
}

/// A built object must carry a valid name and a namespace
pub fn validate_object(obj: &ManagedObject) -> Result<(), String> {
    let key = obj.key();
    if key.namespace.is_empty() {
        return Err(format!("{} {} has no namespace", key.kind, key.name));
    }
    let check = match key.kind {
        ManagedObjectKind::Service => validate_dns1123_label(&key.name),
        _ => validate_dns1123_subdomain(&key.name),
    };
    check.map_err(|e| format!("{} name {:?} {}", key.kind, key.name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_dns1123_subdomain() {
        assert!(validate_dns1123_subdomain("argocd-dex-server").is_ok());
        assert!(validate_dns1123_subdomain("a.b-c").is_ok());
        assert!(validate_dns1123_subdomain("").is_err());
        assert!(validate_dns1123_subdomain("Argocd").is_err());
        assert!(validate_dns1123_subdomain("-argocd").is_err());
        assert!(validate_dns1123_subdomain("argocd_dex").is_err());
    }

    #[test]
    fn test_dns1123_subdomain_checks_every_segment() {
        for name in ["a..b", "a.-b", "a-.b", "a.b.", ".a"] {
            assert!(validate_dns1123_subdomain(name).is_err(), "{name}");
        }
        assert!(validate_dns1123_subdomain("argocd.dex-server.v1").is_ok());
    }

    #[test]
    fn test_dns1123_label() {
        assert!(validate_dns1123_label("argocd-dex-server").is_ok());
        assert!(validate_dns1123_label("a.b").is_err());
        assert!(validate_dns1123_label("dex-").is_err());
        assert!(validate_dns1123_label(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_service_name_length() {
        let name = format!("{}-dex-server", "a".repeat(60));
        let svc: ManagedObject = Service {
            metadata: ObjectMeta {
                name: Some(name),
                namespace: Some("argocd".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
        .into();
        let err = validate_object(&svc).unwrap_err();
        assert!(err.contains("63"), "{err}");
    }

    #[test]
    fn test_custom_resource_needs_namespace() {
        let cr = ArgoCD::new("argocd", Default::default());
        assert!(validate_custom_resource(&cr).is_err());
    }
}
