//! # Converge
//!
//! Drives one managed object towards its desired state:
//!
//! ```text
//! observed = get(key)
//! desired None,  observed None  -> Unchanged
//! desired None,  observed Some  -> delete          (Deleted)
//! desired Some,  observed None  -> create          (Created)
//! immutable field differs       -> delete + create (Recreated)
//! desired not contained in observed -> update applied (Updated)
//! otherwise                     -> Unchanged
//! ```
//!
//! Every written object carries its own serialized desired form under
//! [`LAST_APPLIED_ANNOTATION`]. Drift is detected by checking that every field
//! of that stamped desired object is present with the same value on the
//! observed one: fields defaulted or assigned by the API server (cluster IPs,
//! `uid`, `resourceVersion`, status, extra labels) never count as drift, while
//! a field dropped from the custom resource changes the annotation. Updates
//! are a three-way merge of observed, last applied and desired, so fields the
//! operator wrote earlier and no longer wants are removed. Errors are returned
//! as-is; the engine never retries.

use crate::constants::LAST_APPLIED_ANNOTATION;
use crate::observability;
use crate::store::{cancellable, ManagedObject, ObjectKey, ObjectStore, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a converge call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Unchanged,
    Created,
    Updated,
    Recreated,
    Deleted,
}

impl Transition {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Unchanged => "unchanged",
            Transition::Created => "created",
            Transition::Updated => "updated",
            Transition::Recreated => "recreated",
            Transition::Deleted => "deleted",
        }
    }

    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when every field of `desired` is present in `observed` with the same value
///
/// Objects may carry extra keys; arrays must match element by element.
#[must_use]
pub fn json_contains(observed: &Value, desired: &Value) -> bool {
    match (observed, desired) {
        (Value::Object(o), Value::Object(d)) => d
            .iter()
            .all(|(k, dv)| o.get(k).is_some_and(|ov| json_contains(ov, dv))),
        (Value::Array(o), Value::Array(d)) => {
            o.len() == d.len() && o.iter().zip(d).all(|(ov, dv)| json_contains(ov, dv))
        }
        _ => observed == desired,
    }
}

/// Three-way merge of `desired` into `observed`
///
/// Object keys present in `last` but missing from `desired` are removed,
/// desired keys are merged recursively, arrays and scalars are replaced.
/// Keys the operator never wrote are left alone. With no `last` this is a
/// plain deep merge.
pub fn json_apply(observed: &mut Value, last: Option<&Value>, desired: Value) {
    match (observed, desired) {
        (Value::Object(o), Value::Object(d)) => {
            if let Some(Value::Object(l)) = last {
                for k in l.keys() {
                    if !d.contains_key(k) {
                        o.remove(k);
                    }
                }
            }
            for (k, dv) in d {
                let lv = last.and_then(|l| l.get(k.as_str()));
                json_apply(o.entry(k).or_insert(Value::Null), lv, dv);
            }
        }
        (o, d) => *o = d,
    }
}

/// Immutable fields that differ between desired and observed
///
/// The API server rejects in-place changes to these.
#[must_use]
pub fn immutable_field_changed(observed: &ManagedObject, desired: &ManagedObject) -> bool {
    match (observed, desired) {
        (ManagedObject::Deployment(o), ManagedObject::Deployment(d)) => {
            let selector = |dep: &k8s_openapi::api::apps::v1::Deployment| {
                dep.spec.as_ref().map(|s| s.selector.clone())
            };
            selector(o) != selector(d)
        }
        (ManagedObject::RoleBinding(o), ManagedObject::RoleBinding(d)) => o.role_ref != d.role_ref,
        _ => false,
    }
}

fn invalid(key: &ObjectKey, err: serde_json::Error) -> StoreError {
    StoreError::Invalid {
        key: key.clone(),
        message: err.to_string(),
    }
}

/// The desired form recorded on `obj` by the last write, if any
#[must_use]
pub fn last_applied(obj: &ManagedObject) -> Option<Value> {
    obj.meta()
        .annotations
        .as_ref()?
        .get(LAST_APPLIED_ANNOTATION)
        .and_then(|raw| serde_json::from_str(raw).ok())
}

/// `desired` with its own serialized form recorded under [`LAST_APPLIED_ANNOTATION`]
pub fn with_last_applied(mut desired: ManagedObject) -> Result<ManagedObject, StoreError> {
    let key = desired.key();
    let meta = desired.meta_mut();
    if let Some(annotations) = meta.annotations.as_mut() {
        annotations.remove(LAST_APPLIED_ANNOTATION);
        if annotations.is_empty() {
            meta.annotations = None;
        }
    }
    let raw = desired
        .to_json()
        .and_then(|json| serde_json::to_string(&json))
        .map_err(|e| invalid(&key, e))?;
    desired
        .meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(LAST_APPLIED_ANNOTATION.to_string(), raw);
    Ok(desired)
}

/// Apply the stamped `desired` object over `observed`
///
/// Fields recorded in the observed object's last-applied annotation that are
/// no longer desired are dropped.
pub fn merge_desired(
    observed: &ManagedObject,
    desired: &ManagedObject,
) -> Result<ManagedObject, StoreError> {
    let key = desired.key();
    let last = last_applied(observed);
    let mut merged = observed.to_json().map_err(|e| invalid(&key, e))?;
    let overlay = desired.to_json().map_err(|e| invalid(&key, e))?;
    json_apply(&mut merged, last.as_ref(), overlay);
    ManagedObject::from_json(desired.kind(), merged).map_err(|e| invalid(&key, e))
}

fn has_drift(observed: &ManagedObject, desired: &ManagedObject) -> Result<bool, StoreError> {
    let key = desired.key();
    let observed = observed.to_json().map_err(|e| invalid(&key, e))?;
    let desired = desired.to_json().map_err(|e| invalid(&key, e))?;
    Ok(!json_contains(&observed, &desired))
}

/// Converge the object at `key` towards `desired` (`None` = must not exist)
///
/// Every store call is raced against `token`.
pub async fn converge(
    store: &dyn ObjectStore,
    key: &ObjectKey,
    desired: Option<ManagedObject>,
    token: &CancellationToken,
) -> Result<Transition, StoreError> {
    let observed = cancellable(token, store.get(key)).await?;
    let desired = desired.map(with_last_applied).transpose()?;

    let transition = match (observed, desired) {
        (None, None) => Transition::Unchanged,
        (Some(_), None) => {
            cancellable(token, store.delete(key)).await?;
            Transition::Deleted
        }
        (None, Some(desired)) => {
            cancellable(token, store.create(desired)).await?;
            Transition::Created
        }
        (Some(observed), Some(desired)) => {
            if immutable_field_changed(&observed, &desired) {
                info!("{} has an immutable field change, recreating", key);
                cancellable(token, store.delete(key)).await?;
                cancellable(token, store.create(desired)).await?;
                Transition::Recreated
            } else if has_drift(&observed, &desired)? {
                let merged = merge_desired(&observed, &desired)?;
                cancellable(token, store.update(merged)).await?;
                Transition::Updated
            } else {
                Transition::Unchanged
            }
        }
    };

    if transition.is_write() {
        info!("{} {}", key, transition);
        observability::metrics::record_object_operation(key.kind.as_str(), transition.as_str());
    } else {
        debug!("{} unchanged", key);
    }
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_contains_allows_extra_fields() {
        let observed = json!({"spec": {"clusterIP": "10.0.0.1", "ports": [{"port": 5556, "protocol": "TCP"}]}});
        let desired = json!({"spec": {"ports": [{"port": 5556}]}});
        assert!(json_contains(&observed, &desired));
    }

    #[test]
    fn test_json_contains_detects_changed_value() {
        let observed = json!({"image": "dex:v1"});
        let desired = json!({"image": "dex:v2"});
        assert!(!json_contains(&observed, &desired));
    }

    #[test]
    fn test_json_contains_array_length() {
        let observed = json!({"ports": [1, 2]});
        let desired = json!({"ports": [1, 2, 3]});
        assert!(!json_contains(&observed, &desired));
    }

    #[test]
    fn test_json_apply_keeps_unknown_keys() {
        let mut base = json!({"metadata": {"uid": "u1", "labels": {"extra": "x"}}, "spec": {"clusterIP": "10.0.0.1"}});
        json_apply(
            &mut base,
            None,
            json!({"metadata": {"labels": {"app": "dex"}}, "spec": {"ports": [1]}}),
        );
        assert_eq!(
            base,
            json!({"metadata": {"uid": "u1", "labels": {"extra": "x", "app": "dex"}}, "spec": {"clusterIP": "10.0.0.1", "ports": [1]}})
        );
    }

    #[test]
    fn test_json_apply_drops_fields_no_longer_desired() {
        let mut observed = json!({
            "metadata": {"annotations": {"team": "a", "x-frame": "deny", "external": "kept"}},
            "spec": {"ingressClassName": "nginx", "clusterIP": "10.0.0.1", "rules": [{"host": "a"}]}
        });
        let last = json!({
            "metadata": {"annotations": {"team": "a", "x-frame": "deny"}},
            "spec": {"ingressClassName": "nginx", "rules": [{"host": "a"}]}
        });
        json_apply(
            &mut observed,
            Some(&last),
            json!({"metadata": {"annotations": {"team": "a"}}, "spec": {"rules": [{"host": "b"}]}}),
        );
        assert_eq!(
            observed,
            json!({
                "metadata": {"annotations": {"team": "a", "external": "kept"}},
                "spec": {"clusterIP": "10.0.0.1", "rules": [{"host": "b"}]}
            })
        );
    }

    #[test]
    fn test_last_applied_round_trips_without_nesting() {
        use k8s_openapi::api::core::v1::ServiceAccount;
        use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

        let sa: ManagedObject = ServiceAccount {
            metadata: ObjectMeta {
                name: Some("dex".to_string()),
                namespace: Some("argocd".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
        .into();
        let stamped = with_last_applied(sa.clone()).unwrap();
        let restamped = with_last_applied(stamped.clone()).unwrap();
        assert_eq!(stamped, restamped);
        assert_eq!(last_applied(&stamped), Some(sa.to_json().unwrap()));
    }
}
