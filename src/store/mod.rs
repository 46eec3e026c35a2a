//! # Object Store
//!
//! Get / create / update / delete access to the namespaced objects the
//! operator manages. The reconciler only talks to the [`ObjectStore`] trait.
//!
//! - `kube_api`: Kubernetes API backed store
//! - `memory`: in-process store used by tests and dry runs
//!
//! Every call made by the reconciler goes through [`cancellable`], so a
//! cancelled pass stops at the next store boundary.

mod kube_api;
mod memory;

pub use kube_api::KubeObjectStore;
pub use memory::{InMemoryObjectStore, StoreOperation};

use kube::Resource;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Kinds of objects the operator creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ManagedObjectKind {
    Deployment,
    Service,
    ServiceAccount,
    Role,
    RoleBinding,
    Ingress,
}

impl ManagedObjectKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagedObjectKind::Deployment => "Deployment",
            ManagedObjectKind::Service => "Service",
            ManagedObjectKind::ServiceAccount => "ServiceAccount",
            ManagedObjectKind::Role => "Role",
            ManagedObjectKind::RoleBinding => "RoleBinding",
            ManagedObjectKind::Ingress => "Ingress",
        }
    }
}

impl std::fmt::Display for ManagedObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a managed object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub kind: ManagedObjectKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: ManagedObjectKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A managed object of any supported kind
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedObject {
    Deployment(Deployment),
    Service(Service),
    ServiceAccount(ServiceAccount),
    Role(Role),
    RoleBinding(RoleBinding),
    Ingress(Ingress),
}

macro_rules! with_object {
    ($self:expr, $obj:ident => $body:expr) => {
        match $self {
            ManagedObject::Deployment($obj) => $body,
            ManagedObject::Service($obj) => $body,
            ManagedObject::ServiceAccount($obj) => $body,
            ManagedObject::Role($obj) => $body,
            ManagedObject::RoleBinding($obj) => $body,
            ManagedObject::Ingress($obj) => $body,
        }
    };
}

macro_rules! typed_access {
    ($variant:ident, $ty:ty, $as_ref:ident, $into:ident) => {
        impl From<$ty> for ManagedObject {
            fn from(obj: $ty) -> Self {
                ManagedObject::$variant(obj)
            }
        }

        impl ManagedObject {
            #[must_use]
            pub fn $as_ref(&self) -> Option<&$ty> {
                match self {
                    ManagedObject::$variant(obj) => Some(obj),
                    _ => None,
                }
            }

            #[must_use]
            pub fn $into(self) -> Option<$ty> {
                match self {
                    ManagedObject::$variant(obj) => Some(obj),
                    _ => None,
                }
            }
        }
    };
}

typed_access!(Deployment, Deployment, as_deployment, into_deployment);
typed_access!(Service, Service, as_service, into_service);
typed_access!(ServiceAccount, ServiceAccount, as_service_account, into_service_account);
typed_access!(Role, Role, as_role, into_role);
typed_access!(RoleBinding, RoleBinding, as_role_binding, into_role_binding);
typed_access!(Ingress, Ingress, as_ingress, into_ingress);

impl ManagedObject {
    #[must_use]
    pub fn kind(&self) -> ManagedObjectKind {
        match self {
            ManagedObject::Deployment(_) => ManagedObjectKind::Deployment,
            ManagedObject::Service(_) => ManagedObjectKind::Service,
            ManagedObject::ServiceAccount(_) => ManagedObjectKind::ServiceAccount,
            ManagedObject::Role(_) => ManagedObjectKind::Role,
            ManagedObject::RoleBinding(_) => ManagedObjectKind::RoleBinding,
            ManagedObject::Ingress(_) => ManagedObjectKind::Ingress,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &ObjectMeta {
        with_object!(self, obj => obj.meta())
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        with_object!(self, obj => obj.meta_mut())
    }

    /// Key derived from the object's metadata; missing fields become empty strings
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        let meta = self.meta();
        ObjectKey::new(
            self.kind(),
            meta.namespace.clone().unwrap_or_default(),
            meta.name.clone().unwrap_or_default(),
        )
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        with_object!(self, obj => serde_json::to_value(obj))
    }

    pub fn from_json(
        kind: ManagedObjectKind,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            ManagedObjectKind::Deployment => serde_json::from_value::<Deployment>(value)?.into(),
            ManagedObjectKind::Service => serde_json::from_value::<Service>(value)?.into(),
            ManagedObjectKind::ServiceAccount => {
                serde_json::from_value::<ServiceAccount>(value)?.into()
            }
            ManagedObjectKind::Role => serde_json::from_value::<Role>(value)?.into(),
            ManagedObjectKind::RoleBinding => serde_json::from_value::<RoleBinding>(value)?.into(),
            ManagedObjectKind::Ingress => serde_json::from_value::<Ingress>(value)?.into(),
        })
    }
}

/// Errors returned by an [`ObjectStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(ObjectKey),
    #[error("{0} already exists")]
    AlreadyExists(ObjectKey),
    #[error("conflict writing {key}: {message}")]
    Conflict { key: ObjectKey, message: String },
    #[error("{key} rejected as invalid: {message}")]
    Invalid { key: ObjectKey, message: String },
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Storage of managed objects
///
/// `get` reports absence as `Ok(None)` and `delete` of an absent object is
/// `Ok(())`. Implementations never retry.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError>;
    async fn create(&self, obj: ManagedObject) -> Result<ManagedObject, StoreError>;
    async fn update(&self, obj: ManagedObject) -> Result<ManagedObject, StoreError>;
    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError>;
}

/// Run a store call unless the token is (or becomes) cancelled first
pub async fn cancellable<T, F>(token: &CancellationToken, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StoreError::Cancelled),
        result = call => result,
    }
}
