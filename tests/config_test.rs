//! Environment configuration.
//!
//! Run with: cargo test --test config_test

mod common;

use aerosense_dashboard::config::{Config, ConfigError, Deployment};
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Config::from_lookup(|name| vars.get(name).cloned())
}

#[test]
fn defaults_apply_when_only_required_variables_are_set() {
    let config = common::test_config(&[]);

    assert_eq!(config.row_limit, 10_000);
    assert_eq!(config.cache_ttl_seconds, 3600);
    assert_eq!(config.cache_max_bytes, 209_715_200);
    assert_eq!(config.pressure_window_seconds, 60);
    assert_eq!(config.pressure_cache_max_entries, 256);
    assert_eq!(config.warehouse_dataset, "aerosense-twined.greta");
    assert_eq!(
        config.warehouse_base_url,
        "https://bigquery.googleapis.com/bigquery/v2"
    );
    assert!(!config.disable_cache);
    assert_eq!(config.session_extraction_url, None);
    assert_eq!(config.deployment, Deployment::Local);
    assert_eq!(config.bind_address(), "0.0.0.0:8050");
}

#[test]
fn missing_required_variables_are_reported() {
    let result = lookup(&[("WAREHOUSE_ACCESS_TOKEN", "token")]);
    assert!(matches!(result, Err(ConfigError::Missing("WAREHOUSE_PROJECT_ID"))));

    let result = lookup(&[("WAREHOUSE_PROJECT_ID", "project")]);
    assert!(matches!(result, Err(ConfigError::Missing("WAREHOUSE_ACCESS_TOKEN"))));
}

#[test]
fn unusable_row_limits_are_rejected() {
    for value in ["0", "-5", "lots"] {
        let result = lookup(&[
            ("WAREHOUSE_PROJECT_ID", "project"),
            ("WAREHOUSE_ACCESS_TOKEN", "token"),
            ("ROW_LIMIT", value),
        ]);
        assert!(
            matches!(result, Err(ConfigError::Invalid { name: "ROW_LIMIT", .. })),
            "{value}"
        );
    }
}

#[test]
fn overrides_are_applied() {
    let config = common::test_config(&[
        ("ROW_LIMIT", "500"),
        ("DISABLE_CACHE", "true"),
        ("WAREHOUSE_BASE_URL", "http://localhost:9050/bigquery/v2/"),
        ("SESSION_EXTRACTION_URL", ""),
        ("DEPLOYMENT", "production"),
        ("API_PORT", "9000"),
    ]);

    assert_eq!(config.row_limit, 500);
    assert!(config.disable_cache);
    assert_eq!(config.warehouse_base_url, "http://localhost:9050/bigquery/v2");
    assert_eq!(config.session_extraction_url, None);
    assert_eq!(config.deployment, Deployment::Prod);
    assert_eq!(config.api_port, 9000);
}

#[test]
fn unusable_pressure_windows_are_rejected() {
    for value in ["abc", "0", "-1", "3601", "9223372036854775807"] {
        let result = lookup(&[
            ("WAREHOUSE_PROJECT_ID", "project"),
            ("WAREHOUSE_ACCESS_TOKEN", "token"),
            ("PRESSURE_WINDOW_SECONDS", value),
        ]);
        assert!(
            matches!(
                result,
                Err(ConfigError::Invalid { name: "PRESSURE_WINDOW_SECONDS", .. })
            ),
            "{value}"
        );
    }

    let config = common::test_config(&[("PRESSURE_WINDOW_SECONDS", "3600")]);
    assert_eq!(config.pressure_window_seconds, 3600);
}
