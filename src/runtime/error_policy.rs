//! # Error Policy
//!
//! Error handling and backoff for the controller watch loop: reconciliation
//! errors get a per-resource Fibonacci backoff, watch stream errors are
//! classified and logged.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::ArgoCD;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource (namespace/name) so one failing
/// resource does not slow down the others. A successful pass, or the resource
/// disappearing, drops it.
pub fn handle_reconciliation_error(
    obj: Arc<ArgoCD>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    if let Some(store_error) = error.store_error() {
        error!("Object store error: {:?}", store_error);
    }
    observability::metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) =
        next_backoff(&ctx, &resource_key).unwrap_or((ctx.config.backoff_min_secs, 0));

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds.min(86_400)).unwrap_or(86_400));
    info!(
        "Retrying {} with Fibonacci backoff: {}s (error count: {}), next attempt at {}",
        resource_key,
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Advance the backoff of `resource_key`; `None` if the state lock is poisoned
fn next_backoff(ctx: &Reconciler, resource_key: &str) -> Option<(u64, u32)> {
    let next = ctx.backoff_states.advance(
        resource_key,
        ctx.config.backoff_min_secs,
        ctx.config.backoff_max_secs,
    );
    if next.is_none() {
        warn!("Failed to lock backoff_states, using default backoff");
    }
    next
}

/// Classification of a controller stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// RBAC revoked or token expired
    Unauthorized,
    /// Resource version too old; the watcher relists
    Expired,
    /// API server throttling or storage reinitializing
    Throttled,
    /// Object or CRD missing
    NotFound,
    /// Reconciler returned an error (already handled by the error policy)
    Reconcile,
    Other,
}

#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    // 404 is checked first: a plain-text 404 body surfaces as a WatchFailed serde error
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if error_string.contains("ReconcilerFailed") {
        WatchErrorKind::Reconcile
    } else if is_not_found {
        WatchErrorKind::NotFound
    } else if error_string.contains("401") || error_string.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::Throttled
    } else {
        WatchErrorKind::Other
    }
}

/// Log a controller stream error according to its classification
pub fn handle_watch_stream_error(error_string: &str) -> WatchErrorKind {
    let kind = classify_watch_error(error_string);
    match kind {
        WatchErrorKind::Reconcile => {}
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired");
            error!("   Verify the operator ServiceAccount can list argocds.argoproj.io:");
            error!("      kubectl auth can-i list argocds.argoproj.io --as=system:serviceaccount:<namespace>:argocd-sso-operator --all-namespaces");
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410) - the watcher will relist");
        }
        WatchErrorKind::Throttled => {
            warn!("API server throttling or reinitializing storage (429): {}", error_string);
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Resource not found (404) - normal if the object was deleted or the CRD is missing: {}",
                error_string
            );
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
        }
    }
    kind
}
