//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use argocd_sso_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Object store seam
pub use crate::store::{
    InMemoryObjectStore, KubeObjectStore, ManagedObject, ManagedObjectKind, ObjectKey,
    ObjectStore, StoreError,
};

// Reconciler types
pub use crate::controller::reconciler::{
    reconcile, reconcile_argocd, BackoffState, EnablementSignal, ReconcileOutcome, Reconciler,
    ReconcilerError, Transition,
};

// Config types
pub use crate::config::{ControllerConfig, EnvOverrideSource, OverrideSource, StaticOverride};
