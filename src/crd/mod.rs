//! # Custom Resource Definitions
//!
//! CRD types for the ArgoCD SSO operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Main CRD specification
//! - `sso.rs` - SSO provider selection and Dex settings
//! - `ingress.rs` - Per-component ingress settings
//! - `status.rs` - Status types for tracking reconciliation state

mod ingress;
mod spec;
mod sso;
mod status;

// Re-export all public types
pub use ingress::{
    ArgoCDApplicationSet, ArgoCDGrafanaSpec, ArgoCDIngressSpec, ArgoCDPrometheusSpec,
    ArgoCDServerGRPCSpec, ArgoCDServerSpec, WebhookServerSpec,
};
pub use spec::{ArgoCD, ArgoCDSpec};
pub use sso::{ArgoCDDexSpec, ArgoCDSSOSpec, SsoProviderType};
pub use status::{ArgoCDStatus, Condition};
