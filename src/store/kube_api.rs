//! # Kubernetes Object Store
//!
//! [`ObjectStore`] backed by the Kubernetes API through `kube::Api`.

use super::{ManagedObject, ManagedObjectKind, ObjectKey, ObjectStore, StoreError};
use crate::constants::OPERATOR_NAME;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Object store talking to the API server
#[derive(Clone)]
pub struct KubeObjectStore {
    client: Client,
}

impl std::fmt::Debug for KubeObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeObjectStore").finish_non_exhaustive()
    }
}

impl KubeObjectStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        dry_run: false,
        field_manager: Some(OPERATOR_NAME.to_string()),
    }
}

/// Map an API error onto the store taxonomy
///
/// 409 means AlreadyExists on create and Conflict on update; anything without
/// a dedicated variant is passed through as `StoreError::Kube`.
fn classify(key: &ObjectKey, creating: bool, err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound(key.clone()),
        kube::Error::Api(api_err) if api_err.code == 409 && creating => {
            StoreError::AlreadyExists(key.clone())
        }
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
            key: key.clone(),
            message: api_err.message,
        },
        kube::Error::Api(api_err) if api_err.code == 422 => StoreError::Invalid {
            key: key.clone(),
            message: api_err.message,
        },
        kube::Error::Api(api_err) if api_err.code == 503 => {
            StoreError::Unavailable(api_err.message)
        }
        other => StoreError::Kube(other),
    }
}

async fn get_typed<K>(api: Api<K>, key: &ObjectKey) -> Result<Option<K>, StoreError>
where
    K: Clone + DeserializeOwned + Debug,
{
    api.get_opt(&key.name)
        .await
        .map_err(|e| classify(key, false, e))
}

async fn create_typed<K>(api: Api<K>, key: &ObjectKey, obj: &K) -> Result<K, StoreError>
where
    K: Clone + DeserializeOwned + Serialize + Debug,
{
    api.create(&post_params(), obj)
        .await
        .map_err(|e| classify(key, true, e))
}

async fn replace_typed<K>(api: Api<K>, key: &ObjectKey, obj: &K) -> Result<K, StoreError>
where
    K: Clone + DeserializeOwned + Serialize + Debug,
{
    api.replace(&key.name, &post_params(), obj)
        .await
        .map_err(|e| classify(key, false, e))
}

async fn delete_typed<K>(api: Api<K>, key: &ObjectKey) -> Result<(), StoreError>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(&key.name, &DeleteParams::background()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!("{} already absent", key);
            Ok(())
        }
        Err(e) => Err(classify(key, false, e)),
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError> {
        let ns = key.namespace.as_str();
        Ok(match key.kind {
            ManagedObjectKind::Deployment => get_typed(self.api::<Deployment>(ns), key)
                .await?
                .map(ManagedObject::from),
            ManagedObjectKind::Service => get_typed(self.api::<Service>(ns), key)
                .await?
                .map(ManagedObject::from),
            ManagedObjectKind::ServiceAccount => get_typed(self.api::<ServiceAccount>(ns), key)
                .await?
                .map(ManagedObject::from),
            ManagedObjectKind::Role => get_typed(self.api::<Role>(ns), key)
                .await?
                .map(ManagedObject::from),
            ManagedObjectKind::RoleBinding => get_typed(self.api::<RoleBinding>(ns), key)
                .await?
                .map(ManagedObject::from),
            ManagedObjectKind::Ingress => get_typed(self.api::<Ingress>(ns), key)
                .await?
                .map(ManagedObject::from),
        })
    }

    async fn create(&self, obj: ManagedObject) -> Result<ManagedObject, StoreError> {
        let key = obj.key();
        let ns = key.namespace.as_str();
        Ok(match &obj {
            ManagedObject::Deployment(o) => create_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::Service(o) => create_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::ServiceAccount(o) => create_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::Role(o) => create_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::RoleBinding(o) => create_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::Ingress(o) => create_typed(self.api(ns), &key, o).await?.into(),
        })
    }

    async fn update(&self, obj: ManagedObject) -> Result<ManagedObject, StoreError> {
        let key = obj.key();
        let ns = key.namespace.as_str();
        Ok(match &obj {
            ManagedObject::Deployment(o) => replace_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::Service(o) => replace_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::ServiceAccount(o) => replace_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::Role(o) => replace_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::RoleBinding(o) => replace_typed(self.api(ns), &key, o).await?.into(),
            ManagedObject::Ingress(o) => replace_typed(self.api(ns), &key, o).await?.into(),
        })
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let ns = key.namespace.as_str();
        match key.kind {
            ManagedObjectKind::Deployment => delete_typed(self.api::<Deployment>(ns), key).await,
            ManagedObjectKind::Service => delete_typed(self.api::<Service>(ns), key).await,
            ManagedObjectKind::ServiceAccount => {
                delete_typed(self.api::<ServiceAccount>(ns), key).await
            }
            ManagedObjectKind::Role => delete_typed(self.api::<Role>(ns), key).await,
            ManagedObjectKind::RoleBinding => delete_typed(self.api::<RoleBinding>(ns), key).await,
            ManagedObjectKind::Ingress => delete_typed(self.api::<Ingress>(ns), key).await,
        }
    }
}
