//! # Reconciler
//!
//! Reconciles `ArgoCD` resources: decides whether Dex should exist, builds
//! the desired objects and converges the cluster towards them.
//!
//! - `enablement`: ordered rules deciding Dex enablement
//! - `desired`: pure builders for every managed object
//! - `converge`: per-object get / create / update / delete engine
//! - `dex`, `ingress`: component passes
//! - `status`: status reporting on the custom resource
//! - `reconcile`: the pass and the controller entry point

pub mod converge;
pub mod desired;
pub mod dex;
pub mod enablement;
pub mod ingress;
pub mod reconcile;
pub mod status;
pub mod types;

pub use converge::{converge, Transition};
pub use enablement::{evaluate, is_dex_enabled, DexSettings, EnablementSignal};
pub use reconcile::{reconcile, reconcile_argocd};
pub use types::{BackoffState, BackoffStates, ReconcileOutcome, Reconciler, ReconcilerError};
