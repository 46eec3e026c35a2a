//! ArgoCD SSO Operator Library
//!
//! Reconciles the Dex identity-federation component of an ArgoCD deployment,
//! together with the ingresses that expose ArgoCD and its companions.
//!
//! ## Quick Start
//!
//! ```rust
//! use argocd_sso_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod store;
