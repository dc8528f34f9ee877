//! Property tests for settings assembly and notification coalescing

use proptest::prelude::*;
use serde_json::{json, Value};
use sitewright::{
    assemble, Action, Application, NotificationAggregator, NotifySet, Phase, PlannedAction,
    PlatformFamily, PlatformProfile, RawSettings,
};

fn app() -> Application {
    Application {
        shortname: "exampleapp".to_string(),
        domains: vec!["example.com".to_string()],
        deploy_dir: None,
    }
}

fn settings_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("log_level"),
        Just("log_dir"),
        Just("keepalive_timeout"),
        Just("limit_request_body"),
        Just("proxy_timeout"),
        Just("ssl_for_legacy_browsers"),
        Just("extra_config"),
        Just("extra_config_ssl"),
        Just("port"),
        Just("ssl_port"),
    ]
    .prop_map(str::to_string)
}

fn settings_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        (0u64..100_000).prop_map(|v| json!(v)),
        "[a-zA-Z0-9 /_.-]{0,24}".prop_map(|s| json!(s)),
    ]
}

fn raw_settings() -> impl Strategy<Value = RawSettings> {
    proptest::collection::btree_map(settings_key(), settings_value(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn assembly_is_deterministic(defaults in raw_settings(), overrides in raw_settings()) {
        let profile = PlatformProfile::resolve(PlatformFamily::Debian);
        let first = assemble(&app(), &defaults, &overrides, profile).unwrap();
        let second = assemble(&app(), &defaults, &overrides, profile).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn assembly_is_platform_pure(defaults in raw_settings(), overrides in raw_settings()) {
        // Same inputs on the other platform family only ever differ in the
        // computed log directory.
        let debian = PlatformProfile::resolve(PlatformFamily::Debian);
        let rhel = PlatformProfile::resolve(PlatformFamily::RhelLike);
        let mut on_debian = assemble(&app(), &defaults, &overrides, debian).unwrap();
        let mut on_rhel = assemble(&app(), &defaults, &overrides, rhel).unwrap();
        on_debian.log_dir = Default::default();
        on_rhel.log_dir = Default::default();
        prop_assert_eq!(on_debian, on_rhel);
    }

    #[test]
    fn extra_config_ssl_sentinel_substitutes(
        defaults in raw_settings(),
        extra in "[a-zA-Z0-9 ]{0,24}",
    ) {
        let profile = PlatformProfile::resolve(PlatformFamily::Debian);
        let mut overrides = RawSettings::new();
        overrides.insert("extra_config".to_string(), json!(extra.clone()));
        overrides.insert("extra_config_ssl".to_string(), json!(true));

        let settings = assemble(&app(), &defaults, &overrides, profile).unwrap();
        prop_assert_eq!(&settings.extra_config_ssl, &settings.extra_config);
        prop_assert_eq!(settings.extra_config, extra);
    }

    #[test]
    fn armed_changes_coalesce_to_one_reload(count in 1usize..20) {
        let mut aggregator = NotificationAggregator::for_service("apache2");
        for index in 0..count {
            let planned = PlannedAction {
                action: Action::DeleteFile {
                    path: format!("/etc/apache2/sites-enabled/site{index}.conf").into(),
                },
                notify: NotifySet::RELOAD,
            };
            aggregator.observe(&planned, true, Phase::Configure);
        }
        prop_assert_eq!(aggregator.flush().len(), 1);
    }

    #[test]
    fn unchanged_actions_never_reload(count in 0usize..20) {
        let mut aggregator = NotificationAggregator::for_service("httpd");
        for index in 0..count {
            let planned = PlannedAction {
                action: Action::DeleteFile {
                    path: format!("/etc/httpd/sites-enabled/site{index}.conf").into(),
                },
                notify: NotifySet::RELOAD,
            };
            aggregator.observe(&planned, false, Phase::Configure);
        }
        prop_assert!(aggregator.flush().is_empty());
    }
}
