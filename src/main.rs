//! # ArgoCD SSO Operator
//!
//! Kubernetes operator that reconciles the Dex identity-federation component
//! of `ArgoCD` custom resources.
//!
//! ## Overview
//!
//! For every `ArgoCD` resource the operator:
//!
//! 1. **Decides whether Dex should run** from the process-wide `DISABLE_DEX`
//!    override and the CR's SSO settings (legacy `spec.dex` or `spec.sso`)
//! 2. **Converges the Dex objects** (ServiceAccount, Role, RoleBinding,
//!    Service, Deployment): creating, updating or deleting them
//! 3. **Converges the ingresses** for the server, gRPC, Grafana, Prometheus and
//!    ApplicationSet webhook endpoints
//! 4. **Reports status** on the custom resource
//!
//! Metrics and probes are served on `/metrics`, `/healthz` and `/readyz`.

use anyhow::Result;
use argocd_sso_operator::config::{ControllerConfig, EnvOverrideSource, OverrideSource, StaticOverride};
use argocd_sso_operator::runtime::{initialize, run_watch_loop};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "argocd-sso-operator", version, about = "Reconciles Dex SSO for ArgoCD")]
struct Args {
    /// Port of the metrics and probe server
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Only watch this namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// Log format: json or text
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Force the Dex override instead of reading DISABLE_DEX on every pass
    #[arg(long)]
    disable_dex: Option<bool>,
}

impl Args {
    fn apply(self, mut config: ControllerConfig) -> (ControllerConfig, Option<bool>) {
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(ns) = self.watch_namespace.filter(|ns| !ns.trim().is_empty()) {
            config.watch_namespace = Some(ns);
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        (config, self.disable_dex)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, disable_dex) = Args::parse().apply(ControllerConfig::from_env());

    let overrides: Arc<dyn OverrideSource> = match disable_dex {
        Some(value) => Arc::new(StaticOverride(Some(value))),
        None => Arc::new(EnvOverrideSource),
    };

    let init = initialize(config, overrides).await?;

    run_watch_loop(init.client, init.reconciler, init.server_state).await?;

    init.shutdown.cancel();
    if let Err(e) = init.server_handle.await {
        tracing::warn!("HTTP server task ended abnormally: {}", e);
    }
    info!("Shutdown complete");
    Ok(())
}
