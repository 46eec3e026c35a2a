//! # Dex Enablement
//!
//! Decides whether the Dex component should exist, from the process-wide
//! override and the custom resource. The decision is an ordered list of
//! rules; the first rule that returns a signal wins.
//!
//! | # | Condition                                         | Signal                      |
//! |---|---------------------------------------------------|-----------------------------|
//! | 1 | override set                                      | `DisabledByOverride` / `EnabledByOverride` |
//! | 2 | no `.spec.sso`                                    | `EnabledByLegacyFlag` / `DisabledByAbsence` |
//! | 3 | provider is not `dex`                             | `DisabledByOtherProvider`   |
//! | 4 | provider `dex`, `.spec.sso.dex` set               | `EnabledBySsoNestedConfig`  |
//! | 5 | provider `dex`, legacy `.spec.dex` set            | `EnabledBySsoProvider`      |
//! | 6 | otherwise                                         | `DisabledByAbsence`         |

use crate::crd::{ArgoCDDexSpec, ArgoCDSpec, SsoProviderType};
use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements};

/// Outcome of the enablement rules for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnablementSignal {
    /// `DISABLE_DEX=false`
    EnabledByOverride,
    /// No SSO block, legacy `.spec.dex` asks for Dex
    EnabledByLegacyFlag,
    /// Provider is dex, settings come from the legacy block
    EnabledBySsoProvider,
    /// Provider is dex with a nested `.spec.sso.dex` block
    EnabledBySsoNestedConfig,
    /// `DISABLE_DEX=true`
    DisabledByOverride,
    /// Another provider (or none) is selected
    DisabledByOtherProvider,
    /// Nothing asks for Dex
    DisabledByAbsence,
}

impl EnablementSignal {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(
            self,
            EnablementSignal::EnabledByOverride
                | EnablementSignal::EnabledByLegacyFlag
                | EnablementSignal::EnabledBySsoProvider
                | EnablementSignal::EnabledBySsoNestedConfig
        )
    }

    /// True when the deprecated top-level `.spec.dex` block drove the decision
    #[must_use]
    pub fn from_legacy_block(&self) -> bool {
        matches!(
            self,
            EnablementSignal::EnabledByLegacyFlag | EnablementSignal::EnabledBySsoProvider
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EnablementSignal::EnabledByOverride => "EnabledByOverride",
            EnablementSignal::EnabledByLegacyFlag => "EnabledByLegacyFlag",
            EnablementSignal::EnabledBySsoProvider => "EnabledBySsoProvider",
            EnablementSignal::EnabledBySsoNestedConfig => "EnabledBySsoNestedConfig",
            EnablementSignal::DisabledByOverride => "DisabledByOverride",
            EnablementSignal::DisabledByOtherProvider => "DisabledByOtherProvider",
            EnablementSignal::DisabledByAbsence => "DisabledByAbsence",
        }
    }
}

impl std::fmt::Display for EnablementSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Rule = fn(Option<bool>, &ArgoCDSpec) -> Option<EnablementSignal>;

/// Evaluation order matters
const RULES: &[Rule] = &[
    override_rule,
    no_sso_block_rule,
    other_provider_rule,
    nested_config_rule,
    legacy_with_provider_rule,
];

fn override_rule(dex_disabled: Option<bool>, _spec: &ArgoCDSpec) -> Option<EnablementSignal> {
    dex_disabled.map(|disabled| {
        if disabled {
            EnablementSignal::DisabledByOverride
        } else {
            EnablementSignal::EnabledByOverride
        }
    })
}

fn no_sso_block_rule(_: Option<bool>, spec: &ArgoCDSpec) -> Option<EnablementSignal> {
    if spec.sso.is_some() {
        return None;
    }
    Some(if spec.dex.as_ref().is_some_and(ArgoCDDexSpec::requests_dex) {
        EnablementSignal::EnabledByLegacyFlag
    } else {
        EnablementSignal::DisabledByAbsence
    })
}

fn other_provider_rule(_: Option<bool>, spec: &ArgoCDSpec) -> Option<EnablementSignal> {
    let sso = spec.sso.as_ref()?;
    (sso.provider != Some(SsoProviderType::Dex)).then_some(EnablementSignal::DisabledByOtherProvider)
}

fn nested_config_rule(_: Option<bool>, spec: &ArgoCDSpec) -> Option<EnablementSignal> {
    spec.sso
        .as_ref()
        .and_then(|sso| sso.dex.as_ref())
        .map(|_| EnablementSignal::EnabledBySsoNestedConfig)
}

fn legacy_with_provider_rule(_: Option<bool>, spec: &ArgoCDSpec) -> Option<EnablementSignal> {
    spec.dex.as_ref().map(|_| EnablementSignal::EnabledBySsoProvider)
}

/// Resolve the enablement signal for this pass
///
/// `dex_disabled` is the override value read once by the caller; `Some(true)`
/// disables Dex regardless of the resource.
#[must_use]
pub fn evaluate(dex_disabled: Option<bool>, spec: &ArgoCDSpec) -> EnablementSignal {
    RULES
        .iter()
        .find_map(|rule| rule(dex_disabled, spec))
        .unwrap_or(EnablementSignal::DisabledByAbsence)
}

#[must_use]
pub fn is_dex_enabled(dex_disabled: Option<bool>, spec: &ArgoCDSpec) -> bool {
    evaluate(dex_disabled, spec).is_enabled()
}

/// A nested `.spec.sso.dex` block is present but another provider is selected
#[must_use]
pub fn nested_dex_ignored(spec: &ArgoCDSpec) -> bool {
    spec.sso
        .as_ref()
        .is_some_and(|sso| sso.dex.is_some() && sso.provider != Some(SsoProviderType::Dex))
}

/// Effective Dex settings after merging the nested and legacy blocks
///
/// Nested `.spec.sso.dex` values win field by field over the legacy
/// `.spec.dex`; the nested block only counts when the provider is `dex`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DexSettings {
    pub image: Option<String>,
    pub version: Option<String>,
    pub resources: Option<ResourceRequirements>,
    pub env: Vec<EnvVar>,
    pub config: Option<String>,
    pub open_shift_oauth: bool,
}

impl DexSettings {
    #[must_use]
    pub fn resolve(spec: &ArgoCDSpec) -> Self {
        let nested = spec
            .sso
            .as_ref()
            .filter(|sso| sso.provider == Some(SsoProviderType::Dex))
            .and_then(|sso| sso.dex.as_ref());
        let legacy = spec.dex.as_ref();

        fn pick<T: Clone>(
            nested: Option<&ArgoCDDexSpec>,
            legacy: Option<&ArgoCDDexSpec>,
            field: impl Fn(&ArgoCDDexSpec) -> Option<&T>,
        ) -> Option<T> {
            nested
                .and_then(&field)
                .or_else(|| legacy.and_then(&field))
                .cloned()
        }

        Self {
            image: pick(nested, legacy, |d| non_blank(d.image.as_ref())),
            version: pick(nested, legacy, |d| non_blank(d.version.as_ref())),
            resources: pick(nested, legacy, |d| d.resources.as_ref()),
            env: pick(nested, legacy, |d| d.env.as_ref()).unwrap_or_default(),
            config: pick(nested, legacy, |d| non_blank(d.config.as_ref())),
            open_shift_oauth: nested.is_some_and(|d| d.open_shift_oauth)
                || legacy.is_some_and(|d| d.open_shift_oauth),
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<&String> {
    value.filter(|v| !v.trim().is_empty())
}
