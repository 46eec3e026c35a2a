//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Object names, ports and default images mirror what the ArgoCD platform
//! expects; controller timings can be overridden via environment variables.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default requeue interval after a successful reconciliation (seconds)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

/// Minimum error backoff (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Maximum error backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Environment variable holding the process-wide Dex kill-switch
pub const DISABLE_DEX_ENV: &str = "DISABLE_DEX";

/// Field manager / managed-by label value
pub const OPERATOR_NAME: &str = "argocd-sso-operator";

/// Annotation recording each managed object as the operator last wrote it
pub const LAST_APPLIED_ANNOTATION: &str = "argocd-sso-operator.argoproj.io/last-applied";

/// Value of `app.kubernetes.io/part-of` on every managed object
pub const PART_OF: &str = "argocd";

/// Platform prefix used when naming RBAC objects
pub const ARGOCD_PREFIX: &str = "argocd";

/// Component identifier of the Dex server
pub const DEX_SERVER_COMPONENT: &str = "dex-server";

/// Default Dex image (without tag)
pub const DEFAULT_DEX_IMAGE: &str = "ghcr.io/dexidp/dex";

/// Default Dex version
pub const DEFAULT_DEX_VERSION: &str = "v2.37.0";

/// Default platform image (without tag), used by the copyutil init container
pub const DEFAULT_ARGOCD_IMAGE: &str = "quay.io/argoproj/argocd";

/// Default platform version
pub const DEFAULT_ARGOCD_VERSION: &str = "v2.8.4";

/// Shared scratch volume between the copyutil init container and Dex
pub const DEX_STATIC_FILES_VOLUME: &str = "static-files";

/// Mount path of the shared scratch volume
pub const DEX_SHARED_MOUNT_PATH: &str = "/shared";

pub const DEX_HTTP_PORT: i32 = 5556;
pub const DEX_GRPC_PORT: i32 = 5557;
pub const DEX_METRICS_PORT: i32 = 5558;

/// Liveness endpoint served by Dex on the metrics port
pub const DEX_LIVENESS_PATH: &str = "/healthz/live";

// Ingress suffixes
pub const SERVER_SUFFIX: &str = "server";
pub const GRPC_SUFFIX: &str = "grpc";
pub const GRAFANA_SUFFIX: &str = "grafana";
pub const PROMETHEUS_SUFFIX: &str = "prometheus";
pub const APPLICATION_SET_SUFFIX: &str = "applicationset-controller";

/// Service created by the Prometheus operator for a Prometheus instance
pub const PROMETHEUS_OPERATED_SERVICE: &str = "prometheus-operated";

/// Default node selector key/value applied to managed pods
pub const DEFAULT_NODE_SELECTOR_KEY: &str = "kubernetes.io/os";
pub const DEFAULT_NODE_SELECTOR_VALUE: &str = "linux";
