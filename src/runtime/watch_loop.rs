//! # Watch Loop
//!
//! kube-rs controller watching `ArgoCD` resources and the objects they own.
//! Any change to a CR or to an owned Deployment, Service, ServiceAccount,
//! Role, RoleBinding or Ingress triggers a pass for the owning CR.

use crate::constants::OPERATOR_NAME;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::ArgoCD;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::Api;
use kube::Client;
use kube_runtime::controller::Error as ControllerError;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, Instrument};

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the controller until a shutdown signal is received
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let namespace = reconciler.config.watch_namespace.clone();
    match namespace.as_deref() {
        Some(ns) => info!("Watching ArgoCD resources in namespace {}", ns),
        None => info!("Watching ArgoCD resources in all namespaces"),
    }

    let ns = namespace.as_deref();
    let owned = watcher::Config::default().labels(&format!("app.kubernetes.io/managed-by={OPERATOR_NAME}"));

    let watch_span = tracing::span!(tracing::Level::INFO, "controller.watch", operation = "watch_loop");

    server_state.set_ready(true);

    Controller::new(api::<ArgoCD>(&client, ns), watcher::Config::default().any_semantic())
        .owns(api::<Deployment>(&client, ns), owned.clone())
        .owns(api::<Service>(&client, ns), owned.clone())
        .owns(api::<ServiceAccount>(&client, ns), owned.clone())
        .owns(api::<Role>(&client, ns), owned.clone())
        .owns(api::<RoleBinding>(&client, ns), owned.clone())
        .owns(api::<Ingress>(&client, ns), owned)
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
        .for_each(|result| {
            // A requeued resource that no longer exists: drop its error history
            if let Err(ControllerError::ObjectNotFound(obj_ref)) = &result {
                reconciler.forget_backoff(&format!(
                    "{}/{}",
                    obj_ref.namespace.as_deref().unwrap_or("default"),
                    obj_ref.name
                ));
            }
            async move {
                match result {
                    Ok((obj, _action)) => {
                        debug!("Reconciled {}/{}", obj.namespace.as_deref().unwrap_or_default(), obj.name);
                    }
                    Err(e) => {
                        handle_watch_stream_error(&format!("{e:?}"));
                    }
                }
            }
        })
        .instrument(watch_span)
        .await;

    server_state.set_ready(false);
    reconciler.shutdown.cancel();
    info!("Controller stopped gracefully");
    Ok(())
}
