//! # Reconciliation Logic
//!
//! Main reconciliation pass for `ArgoCD` resources.
//!
//! [`reconcile_argocd`] is the store-level pass: evaluate Dex enablement,
//! converge the Dex objects, then the ingresses. [`reconcile`] wraps it for
//! the kube-rs controller: it reads the override once, records metrics and
//! writes the status. Errors go to the error policy, which owns backoff.

use crate::controller::reconciler::desired::validation;
use crate::controller::reconciler::dex::reconcile_dex;
use crate::controller::reconciler::enablement::{evaluate, nested_dex_ignored};
use crate::controller::reconciler::ingress::reconcile_ingresses;
use crate::controller::reconciler::status::{build_status, update_status};
use crate::controller::reconciler::types::{ReconcileOutcome, Reconciler, ReconcilerError};
use crate::crd::ArgoCD;
use crate::observability;
use crate::store::ObjectStore;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

/// One reconciliation pass over the objects owned by `cr`
///
/// `dex_disabled` is the override value for this pass. Store calls are raced
/// against `token`; the first failing object ends the pass and its error is
/// returned. Nothing is retried here.
pub async fn reconcile_argocd(
    cr: &ArgoCD,
    store: &dyn ObjectStore,
    dex_disabled: Option<bool>,
    token: &CancellationToken,
) -> Result<ReconcileOutcome, ReconcilerError> {
    validation::validate_custom_resource(cr).map_err(ReconcilerError::Validation)?;

    let signal = evaluate(dex_disabled, &cr.spec);
    info!("Dex enablement: {} (enabled: {})", signal, signal.is_enabled());
    if signal.from_legacy_block() {
        warn!(".spec.dex is deprecated, move Dex settings to .spec.sso.dex with provider dex");
    }
    if nested_dex_ignored(&cr.spec) {
        warn!(".spec.sso.dex is ignored because .spec.sso.provider is not dex");
    }

    let dex = reconcile_dex(cr, store, signal, token).await?;
    let ingresses = reconcile_ingresses(cr, store, token).await?;

    Ok(ReconcileOutcome {
        signal,
        dex_disabled_override: dex_disabled,
        dex,
        ingresses,
    })
}

/// Controller entry point
pub async fn reconcile(cr: Arc<ArgoCD>, ctx: Arc<Reconciler>) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = cr.name_any();
    let namespace = cr.namespace().unwrap_or_default();

    let span = tracing::span!(
        tracing::Level::INFO,
        "reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        resource.kind = "ArgoCD"
    );

    async move {
        info!("Reconciling ArgoCD {}/{}", namespace, name);
        observability::metrics::increment_reconciliations();

        // Read once; the rest of the pass only sees this value
        let dex_disabled = ctx.overrides.dex_disabled();
        observability::metrics::set_dex_override(dex_disabled);
        match dex_disabled {
            Some(disabled) => info!("DISABLE_DEX override in effect: {}", disabled),
            None => info!("DISABLE_DEX not set, using the custom resource"),
        }

        let signal = evaluate(dex_disabled, &cr.spec);
        let token = ctx.shutdown.child_token();
        let result = reconcile_argocd(&cr, ctx.store.as_ref(), dex_disabled, &token).await;
        observability::metrics::set_dex_enabled(&namespace, &name, signal.is_enabled());

        let status = build_status(&cr, signal, &result, &chrono::Utc::now().to_rfc3339());
        let status_result = update_status(&ctx.client, &cr, &status).await;
        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        match (result, status_result) {
            (Ok(outcome), Ok(())) => {
                info!(
                    "Reconciled ArgoCD {}/{} ({} writes) in {:?}",
                    namespace,
                    name,
                    outcome.writes(),
                    start.elapsed()
                );
                ctx.forget_backoff(&format!("{namespace}/{name}"));
                observability::metrics::increment_requeues_total("timer-based");
                Ok(Action::requeue(ctx.config.reconcile_interval()))
            }
            (Ok(_), Err(status_err)) => Err(status_err),
            (Err(e), status_result) => {
                if let Err(status_err) = status_result {
                    error!("Failed to record failure on status: {}", status_err);
                }
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}
