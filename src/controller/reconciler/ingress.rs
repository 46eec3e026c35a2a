//! # Ingress Reconciliation
//!
//! Converges the component ingresses. A disabled ingress is deleted if present.

use crate::controller::reconciler::converge::{converge, Transition};
use crate::controller::reconciler::desired::{desired_ingress, ingress_targets, validation};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::ArgoCD;
use crate::store::{ManagedObject, ManagedObjectKind, ObjectKey, ObjectStore};
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub async fn reconcile_ingresses(
    cr: &ArgoCD,
    store: &dyn ObjectStore,
    token: &CancellationToken,
) -> Result<Vec<(ObjectKey, Transition)>, ReconcilerError> {
    let namespace = cr.namespace().unwrap_or_default();

    let mut plan = Vec::new();
    for target in ingress_targets(cr) {
        let key = ObjectKey::new(ManagedObjectKind::Ingress, namespace.clone(), target.name.clone());
        let desired = desired_ingress(cr, &target).map(ManagedObject::from);
        if let Some(obj) = &desired {
            validation::validate_object(obj).map_err(ReconcilerError::Validation)?;
        }
        plan.push((key, desired));
    }

    let mut transitions = Vec::with_capacity(plan.len());
    for (key, desired) in plan {
        let span = tracing::info_span!("reconcile.ingress", object.name = key.name.as_str());
        let transition = converge(store, &key, desired, token)
            .instrument(span)
            .await
            .map_err(|e| ReconcilerError::store(&key, e))?;
        transitions.push((key, transition));
    }
    Ok(transitions)
}
