//! Dex ServiceAccount, Role and RoleBinding.

use super::common::{dex_rbac_name, object_meta};
use crate::constants::DEX_SERVER_COMPONENT;
use crate::crd::ArgoCD;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::ResourceExt;

#[must_use]
pub fn dex_service_account(cr: &ArgoCD) -> ServiceAccount {
    ServiceAccount {
        metadata: object_meta(cr, &dex_rbac_name(cr), DEX_SERVER_COMPONENT),
        ..Default::default()
    }
}

/// Rules granted to Dex: read access to secrets and configmaps
#[must_use]
pub fn dex_policy_rules() -> Vec<PolicyRule> {
    vec![PolicyRule {
        api_groups: Some(vec![String::new()]),
        resources: Some(vec!["secrets".to_string(), "configmaps".to_string()]),
        verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
        ..Default::default()
    }]
}

#[must_use]
pub fn dex_role(cr: &ArgoCD) -> Role {
    Role {
        metadata: object_meta(cr, &dex_rbac_name(cr), DEX_SERVER_COMPONENT),
        rules: Some(dex_policy_rules()),
    }
}

#[must_use]
pub fn dex_role_binding(cr: &ArgoCD) -> RoleBinding {
    let name = dex_rbac_name(cr);
    RoleBinding {
        metadata: object_meta(cr, &name, DEX_SERVER_COMPONENT),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: name.clone(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name,
            namespace: cr.namespace(),
            ..Default::default()
        }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_binding_references_role_and_account() {
        let mut cr = ArgoCD::new("argocd", Default::default());
        cr.metadata.namespace = Some("argocd".to_string());
        let binding = dex_role_binding(&cr);
        assert_eq!(binding.role_ref.name, dex_role(&cr).metadata.name.unwrap());
        let subject = &binding.subjects.unwrap()[0];
        assert_eq!(Some(subject.name.clone()), dex_service_account(&cr).metadata.name);
        assert_eq!(subject.namespace.as_deref(), Some("argocd"));
    }
}
