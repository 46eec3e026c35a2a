//! # Types
//!
//! Core types for the reconciler.

use crate::config::{ControllerConfig, OverrideSource};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::converge::Transition;
use crate::controller::reconciler::enablement::EnablementSignal;
use crate::store::{ManagedObjectKind, ObjectKey, ObjectStore, StoreError};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("invalid desired state: {0}")]
    Validation(String),
    #[error("failed to reconcile {kind} {name}: {source}")]
    Store {
        kind: ManagedObjectKind,
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("reconciliation cancelled")]
    Cancelled,
    #[error("failed to update status: {0}")]
    Status(#[source] kube::Error),
}

impl ReconcilerError {
    /// Wrap a store error for `key`; cancellation keeps its own variant
    #[must_use]
    pub fn store(key: &ObjectKey, source: StoreError) -> Self {
        match source {
            StoreError::Cancelled => ReconcilerError::Cancelled,
            source => ReconcilerError::Store {
                kind: key.kind,
                name: key.name.clone(),
                source,
            },
        }
    }

    /// The store error that ended the pass, if any
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ReconcilerError::Store { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Short machine-readable reason, used in status conditions
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Validation(_) => "ValidationFailed",
            ReconcilerError::Store { .. } => "ObjectStoreError",
            ReconcilerError::Cancelled => "Cancelled",
            ReconcilerError::Status(_) => "StatusUpdateFailed",
        }
    }
}

/// What one pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub signal: EnablementSignal,
    /// Override value read at the start of the pass
    pub dex_disabled_override: Option<bool>,
    pub dex: Vec<(ObjectKey, Transition)>,
    pub ingresses: Vec<(ObjectKey, Transition)>,
}

impl ReconcileOutcome {
    /// Number of objects written during the pass
    #[must_use]
    pub fn writes(&self) -> usize {
        self.dex
            .iter()
            .chain(self.ingresses.iter())
            .filter(|(_, t)| t.is_write())
            .count()
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Backoff state of every resource currently failing, keyed by namespace/name
///
/// Entries are created by the error policy and removed once the resource
/// reconciles successfully or disappears from the cluster.
#[derive(Debug, Default)]
pub struct BackoffStates {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffStates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more error for `resource_key` and return the next delay and
    /// the error count; `None` if the lock is poisoned
    pub fn advance(&self, resource_key: &str, min_secs: u64, max_secs: u64) -> Option<(u64, u32)> {
        let mut states = self.states.lock().ok()?;
        let state = states
            .entry(resource_key.to_string())
            .or_insert_with(|| BackoffState::new(min_secs, max_secs));
        state.increment_error();
        Some((state.backoff.next_backoff_seconds(), state.error_count))
    }

    /// Drop the error history of `resource_key`
    pub fn forget(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(resource_key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.lock().map(|s| s.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared controller context
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub store: Arc<dyn ObjectStore>,
    pub overrides: Arc<dyn OverrideSource>,
    pub config: ControllerConfig,
    // Backoff state per resource (namespace/name), driven by the error policy
    pub backoff_states: Arc<BackoffStates>,
    // Cancelled on shutdown; in-flight store calls fail fast
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .field("overrides", &self.overrides)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        client: Client,
        store: Arc<dyn ObjectStore>,
        overrides: Arc<dyn OverrideSource>,
        config: ControllerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            store,
            overrides,
            config,
            backoff_states: Arc::new(BackoffStates::new()),
            shutdown,
        }
    }

    /// Forget the error history of a resource after a successful pass or
    /// once it no longer exists
    pub fn forget_backoff(&self, resource_key: &str) {
        self.backoff_states.forget(resource_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_store_error_maps_to_cancelled() {
        let key = ObjectKey::new(ManagedObjectKind::Role, "argocd", "argocd-argocd-dex-server");
        assert!(matches!(
            ReconcilerError::store(&key, StoreError::Cancelled),
            ReconcilerError::Cancelled
        ));
        let err = ReconcilerError::store(&key, StoreError::Unavailable("down".to_string()));
        assert!(matches!(err.store_error(), Some(StoreError::Unavailable(_))));
        assert_eq!(err.reason(), "ObjectStoreError");
    }

    #[test]
    fn test_backoff_state_reset() {
        let mut state = BackoffState::new(5, 300);
        state.increment_error();
        state.backoff.next_backoff_seconds();
        state.backoff.next_backoff_seconds();
        state.reset();
        assert_eq!(state.error_count, 0);
        assert_eq!(state.backoff.next_backoff_seconds(), 5);
    }

    #[test]
    fn test_backoff_states_advance_and_forget() {
        let states = BackoffStates::new();
        assert_eq!(states.advance("argocd/argocd", 5, 300), Some((5, 1)));
        assert_eq!(states.advance("argocd/argocd", 5, 300), Some((5, 2)));
        assert_eq!(states.advance("argocd/argocd", 5, 300), Some((10, 3)));
        states.advance("other/argocd", 5, 300);
        assert_eq!(states.len(), 2);

        states.forget("argocd/argocd");
        assert_eq!(states.len(), 1);
        assert_eq!(states.advance("argocd/argocd", 5, 300), Some((5, 1)));

        states.forget("argocd/argocd");
        states.forget("other/argocd");
        assert!(states.is_empty());
    }
}
