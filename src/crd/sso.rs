//! # SSO Configuration
//!
//! Provider selection and Dex settings, both the nested `.spec.sso.dex` form
//! and the legacy top-level `.spec.dex` form share `ArgoCDDexSpec`.

use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements};
use serde::{Deserialize, Serialize};

/// Identity provider backing single sign-on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SsoProviderType {
    Dex,
    Keycloak,
}

impl SsoProviderType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SsoProviderType::Dex => "dex",
            SsoProviderType::Keycloak => "keycloak",
        }
    }
}

impl std::fmt::Display for SsoProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `.spec.sso`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSSOSpec {
    /// Selected provider; anything other than `dex` disables the Dex component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<SsoProviderType>,
    /// Dex settings, only honoured when `provider` is `dex`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex: Option<ArgoCDDexSpec>,
}

/// Dex settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDDexSpec {
    /// Raw Dex connector configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Dex container image (without tag)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Dex image tag or digest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Use the built-in OpenShift OAuth connector
    #[serde(rename = "openShiftOAuth", default)]
    pub open_shift_oauth: bool,
    /// Compute resources for the Dex pod containers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Extra environment for the Dex container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
}

impl ArgoCDDexSpec {
    /// Whether this block, used as the legacy `.spec.dex`, asks for Dex on its own
    #[must_use]
    pub fn requests_dex(&self) -> bool {
        self.open_shift_oauth || self.config.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}
