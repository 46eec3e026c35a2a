//! # In-Memory Object Store
//!
//! Process-local [`ObjectStore`] that behaves like a tiny API server: it
//! assigns `uid`, `resourceVersion` and Service cluster IPs, rejects stale
//! updates, records every call and can be told to fail specific operations.

use super::{ManagedObject, ManagedObjectKind, ObjectKey, ObjectStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Store call recorded by [`InMemoryObjectStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    Create,
    Update,
    Delete,
}

impl StoreOperation {
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreOperation::Get)
    }
}

type FailureFn = Arc<dyn Fn(&ObjectKey) -> StoreError + Send + Sync>;

struct Failure {
    operation: StoreOperation,
    kind: Option<ManagedObjectKind>,
    make_error: FailureFn,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, ManagedObject>,
    log: Vec<(StoreOperation, ObjectKey)>,
    failures: Vec<Failure>,
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    state: Mutex<State>,
    counter: AtomicU64,
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.state.lock().map(|s| s.objects.len()).unwrap_or_default();
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &len)
            .finish_non_exhaustive()
    }
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {e}")))
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Insert an object as-is, bypassing the operation log
    ///
    /// Missing `uid` and `resourceVersion` are assigned like a create would.
    pub fn seed(&self, obj: impl Into<ManagedObject>) {
        let mut obj = obj.into();
        self.stamp_new(&mut obj);
        if let Ok(mut state) = self.state.lock() {
            state.objects.insert(obj.key(), obj);
        }
    }

    /// Make every matching call fail with the error built by `make_error`
    ///
    /// `kind: None` matches all kinds. Failures stay armed until
    /// [`clear_failures`](Self::clear_failures).
    pub fn fail_on<F>(&self, operation: StoreOperation, kind: Option<ManagedObjectKind>, make_error: F)
    where
        F: Fn(&ObjectKey) -> StoreError + Send + Sync + 'static,
    {
        if let Ok(mut state) = self.state.lock() {
            state.failures.push(Failure {
                operation,
                kind,
                make_error: Arc::new(make_error),
            });
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.clear();
        }
    }

    /// Every recorded call, oldest first
    #[must_use]
    pub fn operations(&self) -> Vec<(StoreOperation, ObjectKey)> {
        self.state.lock().map(|s| s.log.clone()).unwrap_or_default()
    }

    /// Number of create, update and delete calls recorded
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.operations()
            .iter()
            .filter(|(op, _)| op.is_write())
            .count()
    }

    pub fn clear_operations(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.log.clear();
        }
    }

    /// Snapshot of a stored object without recording a call
    #[must_use]
    pub fn peek(&self, key: &ObjectKey) -> Option<ManagedObject> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.objects.get(key).cloned())
    }

    #[must_use]
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.state
            .lock()
            .map(|s| s.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.objects.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stamp_new(&self, obj: &mut ManagedObject) {
        let n = self.next();
        let meta = obj.meta_mut();
        if meta.uid.is_none() {
            meta.uid = Some(format!("uid-{n:06}"));
        }
        if meta.resource_version.is_none() {
            meta.resource_version = Some(n.to_string());
        }
        if let ManagedObject::Service(svc) = obj {
            if let Some(spec) = svc.spec.as_mut() {
                if spec.cluster_ip.is_none() {
                    let ip = format!("10.96.{}.{}", (n / 250) % 250, n % 250 + 1);
                    spec.cluster_ip = Some(ip.clone());
                    spec.cluster_ips = Some(vec![ip]);
                }
            }
        }
    }

    /// Record the call, then return the injected failure if one matches
    fn enter(&self, state: &mut State, operation: StoreOperation, key: &ObjectKey) -> Result<(), StoreError> {
        state.log.push((operation, key.clone()));
        match state
            .failures
            .iter()
            .find(|f| f.operation == operation && f.kind.is_none_or(|k| k == key.kind))
        {
            Some(failure) => Err((failure.make_error)(key)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError> {
        let mut state = self.lock()?;
        self.enter(&mut state, StoreOperation::Get, key)?;
        Ok(state.objects.get(key).cloned())
    }

    async fn create(&self, mut obj: ManagedObject) -> Result<ManagedObject, StoreError> {
        let key = obj.key();
        let mut state = self.lock()?;
        self.enter(&mut state, StoreOperation::Create, &key)?;
        if key.name.is_empty() || key.namespace.is_empty() {
            return Err(StoreError::Invalid {
                key,
                message: "name and namespace are required".to_string(),
            });
        }
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        {
            let meta = obj.meta_mut();
            meta.uid = None;
            meta.resource_version = None;
        }
        self.stamp_new(&mut obj);
        state.objects.insert(key, obj.clone());
        Ok(obj)
    }

    async fn update(&self, mut obj: ManagedObject) -> Result<ManagedObject, StoreError> {
        let key = obj.key();
        let mut state = self.lock()?;
        self.enter(&mut state, StoreOperation::Update, &key)?;
        let Some(current) = state.objects.get(&key) else {
            return Err(StoreError::NotFound(key));
        };
        let current_meta = current.meta().clone();
        if let Some(rv) = obj.meta().resource_version.as_deref() {
            if Some(rv) != current_meta.resource_version.as_deref() {
                return Err(StoreError::Conflict {
                    key,
                    message: format!(
                        "resourceVersion {rv} is stale (current {})",
                        current_meta.resource_version.unwrap_or_default()
                    ),
                });
            }
        }
        let n = self.next();
        let meta = obj.meta_mut();
        meta.uid = current_meta.uid;
        meta.resource_version = Some(n.to_string());
        state.objects.insert(key, obj.clone());
        Ok(obj)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        self.enter(&mut state, StoreOperation::Delete, key)?;
        state.objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Service, ServiceAccount, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn sa(name: &str) -> ManagedObject {
        ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("argocd".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
        .into()
    }

    #[tokio::test]
    async fn test_create_assigns_identity() {
        let store = InMemoryObjectStore::new();
        let created = store.create(sa("dex")).await.unwrap();
        assert!(created.meta().uid.is_some());
        assert!(created.meta().resource_version.is_some());
        assert!(matches!(
            store.create(sa("dex")).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_uid_and_rejects_stale_version() {
        let store = InMemoryObjectStore::new();
        let created = store.create(sa("dex")).await.unwrap();
        let updated = store.update(created.clone()).await.unwrap();
        assert_eq!(updated.meta().uid, created.meta().uid);
        assert_ne!(updated.meta().resource_version, created.meta().resource_version);

        let stale = store.update(created).await;
        assert!(matches!(stale, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        assert!(matches!(
            store.update(sa("ghost")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let store = InMemoryObjectStore::new();
        let key = sa("ghost").key();
        store.delete(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_service_gets_cluster_ip() {
        let store = InMemoryObjectStore::new();
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("dex".to_string()),
                namespace: Some("argocd".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec::default()),
            ..Default::default()
        };
        let created = store.create(svc.into()).await.unwrap();
        let spec = created.as_service().and_then(|s| s.spec.as_ref()).unwrap();
        assert!(spec.cluster_ip.is_some());
    }

    #[tokio::test]
    async fn test_injected_failure_matches_kind() {
        let store = InMemoryObjectStore::new();
        store.fail_on(StoreOperation::Create, Some(ManagedObjectKind::Role), |_| {
            StoreError::Unavailable("api down".to_string())
        });
        store.create(sa("dex")).await.unwrap();
        assert_eq!(store.write_count(), 1);
        store.clear_failures();
        store.clear_operations();
        assert!(store.operations().is_empty());
    }
}
