//! Testing utilities for the shift workspace
//!
//! Sample rules, a registry holding all of them, and helpers that run the
//! pipelines on text fixtures.

#![allow(missing_docs)]

pub mod rules;

use serde_json::{json, Value};
use shift_core::MigrationSettings;
use shift_engine::{
    migrate_config, migrate_state, ConfigOutcome, RuleRegistry, StateOutcome,
};

pub use rules::{CacheRule, FirewallRule, ListRule, RecordRule, WidgetRule, ZonesRule, VERSIONS};

/// Install a test subscriber honoring `RUST_LOG`; repeated calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registry with every sample rule
pub fn sample_registry() -> RuleRegistry {
    RuleRegistry::builder()
        .with_rule(WidgetRule)
        .unwrap()
        .with_rule(ZonesRule)
        .unwrap()
        .with_rule(RecordRule)
        .unwrap()
        .with_rule(ListRule)
        .unwrap()
        .with_rule(FirewallRule)
        .unwrap()
        .with_rule(CacheRule)
        .unwrap()
        .build()
}

/// Default v4 -> v5 settings
pub fn settings() -> MigrationSettings {
    MigrationSettings::new(VERSIONS.source, VERSIONS.target)
}

/// Migrate one configuration file with the sample rules
pub fn migrate_config_text(src: &str) -> ConfigOutcome {
    migrate_config_with(&settings(), src)
}

pub fn migrate_config_with(settings: &MigrationSettings, src: &str) -> ConfigOutcome {
    init_tracing();
    migrate_config(&sample_registry(), settings, Some("main.tf"), src).unwrap()
}

/// Migrate one state document with the sample rules
pub fn migrate_state_text(src: &str) -> StateOutcome {
    migrate_state_with(&settings(), src)
}

pub fn migrate_state_with(settings: &MigrationSettings, src: &str) -> StateOutcome {
    init_tracing();
    migrate_state(&sample_registry(), settings, Some("terraform.tfstate"), src).unwrap()
}

/// State document text with the given resource entries
pub fn state_document(resources: Value) -> String {
    let document = json!({
        "version": 4,
        "terraform_version": "1.5.7",
        "serial": 12,
        "lineage": "0b5c6a2e-1f7e-4a53-9e0c-3d9f2a1c7b44",
        "outputs": {},
        "resources": resources,
    });
    serde_json::to_string_pretty(&document).unwrap()
}

/// One managed resource entry with a single instance
pub fn managed(resource_type: &str, name: &str, schema_version: u64, attributes: Value) -> Value {
    json!({
        "mode": "managed",
        "type": resource_type,
        "name": name,
        "provider": "provider[\"registry.example.com/acme/acme\"]",
        "instances": [{"schema_version": schema_version, "attributes": attributes}],
    })
}

/// One data source entry with a single instance
pub fn data(resource_type: &str, name: &str, attributes: Value) -> Value {
    json!({
        "mode": "data",
        "type": resource_type,
        "name": name,
        "provider": "provider[\"registry.example.com/acme/acme\"]",
        "instances": [{"schema_version": 0, "attributes": attributes}],
    })
}
