//! # CRD Generator
//!
//! Prints the `ArgoCD` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/argocd.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use argocd_sso_operator::crd::ArgoCD;
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&ArgoCD::crd())?);
    Ok(())
}
