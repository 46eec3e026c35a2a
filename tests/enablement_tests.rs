//! Dex enablement decision table
//!
//! Every combination of override, SSO provider, nested block and legacy block.

use argocd_sso_operator::controller::reconciler::{evaluate, is_dex_enabled, EnablementSignal};
use argocd_sso_operator::crd::{ArgoCDDexSpec, ArgoCDSSOSpec, ArgoCDSpec, SsoProviderType};

#[derive(Debug, Clone, Copy)]
enum Legacy {
    Absent,
    Empty,
    OpenShiftOAuth,
    Config,
}

fn legacy_block(legacy: Legacy) -> Option<ArgoCDDexSpec> {
    match legacy {
        Legacy::Absent => None,
        Legacy::Empty => Some(ArgoCDDexSpec::default()),
        Legacy::OpenShiftOAuth => Some(ArgoCDDexSpec {
            open_shift_oauth: true,
            ..Default::default()
        }),
        Legacy::Config => Some(ArgoCDDexSpec {
            config: Some("connectors: []".to_string()),
            ..Default::default()
        }),
    }
}

fn spec(sso: Option<(Option<SsoProviderType>, bool)>, legacy: Legacy) -> ArgoCDSpec {
    ArgoCDSpec {
        dex: legacy_block(legacy),
        sso: sso.map(|(provider, nested)| ArgoCDSSOSpec {
            provider,
            dex: nested.then(ArgoCDDexSpec::default),
        }),
        ..Default::default()
    }
}

const LEGACY: [Legacy; 4] = [Legacy::Absent, Legacy::Empty, Legacy::OpenShiftOAuth, Legacy::Config];

fn expected(sso: Option<(Option<SsoProviderType>, bool)>, legacy: Legacy) -> EnablementSignal {
    match sso {
        None => match legacy {
            Legacy::OpenShiftOAuth | Legacy::Config => EnablementSignal::EnabledByLegacyFlag,
            Legacy::Absent | Legacy::Empty => EnablementSignal::DisabledByAbsence,
        },
        Some((Some(SsoProviderType::Dex), true)) => EnablementSignal::EnabledBySsoNestedConfig,
        Some((Some(SsoProviderType::Dex), false)) => match legacy {
            Legacy::Absent => EnablementSignal::DisabledByAbsence,
            _ => EnablementSignal::EnabledBySsoProvider,
        },
        Some(_) => EnablementSignal::DisabledByOtherProvider,
    }
}

fn sso_cases() -> Vec<Option<(Option<SsoProviderType>, bool)>> {
    let mut cases = vec![None];
    for provider in [None, Some(SsoProviderType::Dex), Some(SsoProviderType::Keycloak)] {
        for nested in [false, true] {
            cases.push(Some((provider, nested)));
        }
    }
    cases
}

#[test]
fn test_decision_table_without_override() {
    for sso in sso_cases() {
        for legacy in LEGACY {
            let spec = spec(sso, legacy);
            assert_eq!(
                evaluate(None, &spec),
                expected(sso, legacy),
                "sso {sso:?}, legacy {legacy:?}"
            );
        }
    }
}

#[test]
fn test_override_true_always_disables() {
    for sso in sso_cases() {
        for legacy in LEGACY {
            let spec = spec(sso, legacy);
            assert_eq!(evaluate(Some(true), &spec), EnablementSignal::DisabledByOverride);
            assert!(!is_dex_enabled(Some(true), &spec));
        }
    }
}

#[test]
fn test_override_false_always_enables() {
    for sso in sso_cases() {
        for legacy in LEGACY {
            let spec = spec(sso, legacy);
            assert_eq!(evaluate(Some(false), &spec), EnablementSignal::EnabledByOverride);
            assert!(is_dex_enabled(Some(false), &spec));
        }
    }
}

#[test]
fn test_signal_enabled_flags() {
    let enabled = [
        EnablementSignal::EnabledByOverride,
        EnablementSignal::EnabledByLegacyFlag,
        EnablementSignal::EnabledBySsoProvider,
        EnablementSignal::EnabledBySsoNestedConfig,
    ];
    let disabled = [
        EnablementSignal::DisabledByOverride,
        EnablementSignal::DisabledByOtherProvider,
        EnablementSignal::DisabledByAbsence,
    ];
    assert!(enabled.iter().all(EnablementSignal::is_enabled));
    assert!(!disabled.iter().any(EnablementSignal::is_enabled));
}

#[test]
fn test_provider_parsed_from_yaml() {
    let spec: ArgoCDSpec = serde_yaml::from_str(
        r#"
sso:
  provider: dex
  dex:
    openShiftOAuth: true
"#,
    )
    .expect("valid spec");
    assert_eq!(evaluate(None, &spec), EnablementSignal::EnabledBySsoNestedConfig);

    let spec: ArgoCDSpec = serde_yaml::from_str(
        r#"
dex:
  openShiftOAuth: true
sso:
  provider: keycloak
"#,
    )
    .expect("valid spec");
    assert_eq!(evaluate(None, &spec), EnablementSignal::DisabledByOtherProvider);
}
