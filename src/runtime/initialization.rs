//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and reconciler context.

use crate::config::{ControllerConfig, OverrideSource};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::ArgoCD;
use crate::observability;
use crate::observability::logging::LogFormat;
use crate::store::KubeObjectStore;
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    /// Cancelled on shutdown; stops the HTTP server and in-flight store calls
    pub shutdown: CancellationToken,
    pub server_handle: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// Sets up the rustls crypto provider, tracing and metrics, starts the HTTP
/// server, creates the Kubernetes client and the reconciler context.
pub async fn initialize(
    config: ControllerConfig,
    overrides: Arc<dyn OverrideSource>,
) -> Result<InitializationResult> {
    observability::logging::init_tracing(LogFormat::parse(&config.log_format), &config.log_level)
        .context("Failed to initialize tracing")?;

    // Must run before any rustls connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting ArgoCD SSO operator");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let shutdown = CancellationToken::new();
    let server_state = Arc::new(ServerState::default());

    let server_port = config.metrics_port;
    let server_state_clone = server_state.clone();
    let server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone, server_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let store = Arc::new(KubeObjectStore::new(client.clone()));
    let reconciler = Arc::new(Reconciler::new(
        client.clone(),
        store,
        overrides,
        config,
        shutdown.clone(),
    ));

    summarize_existing_resources(&client, &reconciler).await?;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        shutdown,
        server_handle,
    })
}

/// Check the CRD is queryable and log the resources found at startup
///
/// The controller's initial list reconciles every one of them; this only
/// fails early when the CRD is not installed.
async fn summarize_existing_resources(client: &Client, reconciler: &Reconciler) -> Result<()> {
    let startup_span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.existing_resources",
        operation = "summarize_existing_resources"
    );
    let api: Api<ArgoCD> = match reconciler.config.watch_namespace.as_deref() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let list = api
        .list(&ListParams::default())
        .instrument(startup_span.clone())
        .await
        .map_err(|e| {
            error!("ArgoCD CRD is not queryable: {}", e);
            error!("   Install it with: crdgen | kubectl apply -f -");
            anyhow::anyhow!("ArgoCD CRD is not queryable: {e}")
        })?;
    let _guard = startup_span.enter();

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        by_namespace
            .entry(item.metadata.namespace.clone().unwrap_or_else(|| "default".to_string()))
            .or_default()
            .push(item.metadata.name.clone().unwrap_or_else(|| "unknown".to_string()));
    }

    info!(
        "Found {} existing ArgoCD resources in {} namespaces",
        list.items.len(),
        by_namespace.len()
    );
    for (namespace, names) in &by_namespace {
        info!("  {}: {}", namespace, names.join(", "));
    }

    Ok(())
}
