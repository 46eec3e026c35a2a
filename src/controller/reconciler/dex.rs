//! # Dex Reconciliation
//!
//! Converges the five Dex objects (ServiceAccount, Role, RoleBinding, Service,
//! Deployment) to the enablement decision of the pass. Enabled builds and
//! validates every object before the first write; disabled deletes whatever
//! still exists. The first failing object ends the pass.

use crate::controller::reconciler::converge::{converge, Transition};
use crate::controller::reconciler::desired::{
    desired_dex_object, dex_object_key, validation, DEX_OBJECT_ORDER,
};
use crate::controller::reconciler::enablement::{DexSettings, EnablementSignal};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::ArgoCD;
use crate::store::{ManagedObject, ObjectKey, ObjectStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

/// Desired Dex objects keyed in reconcile order (`None` = must not exist)
///
/// Fails with `Validation` if any built object is invalid.
pub fn plan_dex(
    cr: &ArgoCD,
    signal: EnablementSignal,
) -> Result<Vec<(ObjectKey, Option<ManagedObject>)>, ReconcilerError> {
    let settings = signal.is_enabled().then(|| DexSettings::resolve(&cr.spec));
    let mut plan = Vec::with_capacity(DEX_OBJECT_ORDER.len());
    for kind in DEX_OBJECT_ORDER {
        let key = dex_object_key(cr, kind);
        let desired = settings
            .as_ref()
            .and_then(|settings| desired_dex_object(cr, settings, kind));
        if let Some(obj) = &desired {
            validation::validate_object(obj).map_err(ReconcilerError::Validation)?;
        }
        plan.push((key, desired));
    }
    Ok(plan)
}

/// Converge every Dex object for `cr` according to `signal`
pub async fn reconcile_dex(
    cr: &ArgoCD,
    store: &dyn ObjectStore,
    signal: EnablementSignal,
    token: &CancellationToken,
) -> Result<Vec<(ObjectKey, Transition)>, ReconcilerError> {
    let plan = plan_dex(cr, signal)?;
    debug!(
        "Dex {} ({}), converging {} objects",
        if signal.is_enabled() { "enabled" } else { "disabled" },
        signal,
        plan.len()
    );

    let mut transitions = Vec::with_capacity(plan.len());
    for (key, desired) in plan {
        let span = tracing::info_span!(
            "reconcile.dex.object",
            object.kind = key.kind.as_str(),
            object.name = key.name.as_str()
        );
        let transition = converge(store, &key, desired, token)
            .instrument(span)
            .await
            .map_err(|e| ReconcilerError::store(&key, e))?;
        transitions.push((key, transition));
    }
    Ok(transitions)
}
