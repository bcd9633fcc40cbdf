// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Cadence configuration system.

use cadence_config::diagnostic::ConfigError;
use cadence_config::model::{CadenceConfig, StateBackend};
use cadence_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_cadence_config() {
    let toml = r#"
[service]
instance_id = "worker-1"
log_level = "debug"

[storage]
database_path = "/tmp/cadence.db"
wal_mode = false

[state]
backend = "memory"

[debounce]
sweep_interval_ms = 250
quiet_period_ms = 2000

[followup]
poll_interval_secs = 30
batch_size = 50
default_lead_name = "customer"

[dispatch]
max_concurrent = 4
lock_ttl_secs = 90

[responder]
endpoint = "https://responder.internal/hooks"
auth_token = "secret"
timeout_secs = 10
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.instance_id.as_deref(), Some("worker-1"));
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/cadence.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.state.backend, StateBackend::Memory);
    assert_eq!(config.debounce.sweep_interval_ms, 250);
    assert_eq!(config.debounce.quiet_period_ms, 2000);
    assert_eq!(config.followup.poll_interval_secs, 30);
    assert_eq!(config.followup.batch_size, 50);
    assert_eq!(config.followup.default_lead_name, "customer");
    assert_eq!(config.dispatch.max_concurrent, 4);
    assert_eq!(config.dispatch.lock_ttl_secs, 90);
    assert_eq!(
        config.responder.endpoint.as_deref(),
        Some("https://responder.internal/hooks")
    );
    assert_eq!(config.responder.timeout_secs, 10);
}

/// Serialized defaults match the documented recommendations.
#[test]
fn defaults_are_the_recommended_periods() {
    let config = CadenceConfig::default();

    assert_eq!(config.debounce.sweep_interval_ms, 500);
    assert_eq!(config.debounce.quiet_period_ms, 3000);
    assert_eq!(config.followup.poll_interval_secs, 60);
    assert_eq!(config.state.backend, StateBackend::Sqlite);
    assert!(config.storage.database_path.ends_with("cadence.db"));
    assert!(config.state.database_path.ends_with("cadence-state.db"));
    assert!(config.responder.endpoint.is_none());
}

/// Missing optional sections fall back to defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("[debounce]\nquiet_period_ms = 5000\n").unwrap();
    assert_eq!(config.debounce.quiet_period_ms, 5000);
    assert_eq!(config.debounce.sweep_interval_ms, 500);
    assert_eq!(config.followup.batch_size, 200);
}

#[test]
fn unknown_field_produces_error() {
    let err = load_config_from_str("[debounce]\nquiet_perod_ms = 10\n")
        .expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("quiet_perod_ms"),
        "error should mention the bad key, got: {err_str}"
    );
}

#[test]
fn deny_unknown_fields_at_top_level() {
    assert!(load_config_from_str("[agent]\nname = \"x\"\n").is_err());
}

/// Dot-path overrides (what the env provider produces) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: CadenceConfig = Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::string("[debounce]\nquiet_period_ms = 4000\n"))
        .merge(("debounce.quiet_period_ms", 6000))
        .extract()
        .expect("should merge override");

    assert_eq!(config.debounce.quiet_period_ms, 6000);
}

#[test]
#[serial_test::serial]
fn env_var_maps_to_section_key() {
    use figment::Jail;

    Jail::expect_with(|jail| {
        jail.create_file("cadence.toml", "[followup]\nbatch_size = 10\n")?;
        jail.set_env("CADENCE_FOLLOWUP_BATCH_SIZE", "25");
        jail.set_env("CADENCE_DEBOUNCE_QUIET_PERIOD_MS", "4500");

        let config = cadence_config::load_config_from_path(std::path::Path::new("cadence.toml"))?;
        assert_eq!(config.followup.batch_size, 25);
        assert_eq!(config.debounce.quiet_period_ms, 4500);
        Ok(())
    });
}

#[test]
fn diagnostic_error_includes_suggestion_and_valid_keys() {
    let errors = load_and_validate_str("[debounce]\nquiet_perod_ms = 10\n")
        .expect_err("should produce errors");

    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "quiet_perod_ms"
                && suggestion.as_deref() == Some("quiet_period_ms")
                && valid_keys.contains("sweep_interval_ms")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn diagnostic_invalid_type_names_the_key() {
    let errors = load_and_validate_str("[dispatch]\nmax_concurrent = \"many\"\n")
        .expect_err("should reject invalid type");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("max_concurrent"))
    ));
}

#[test]
fn validation_runs_after_parse() {
    let errors = load_and_validate_str("[dispatch]\nmax_concurrent = 0\n")
        .expect_err("zero workers should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("max_concurrent"))
    ));
}

#[test]
#[serial_test::serial]
fn load_and_validate_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.toml");
    std::fs::write(&path, "[followup]\ndefault_lead_name = \"amigo\"\n").unwrap();

    let config = load_and_validate_path(&path).expect("valid file");
    assert_eq!(config.followup.default_lead_name, "amigo");
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::Validation {
        message: "debounce.sweep_interval_ms must be greater than 0".to_string(),
    };
    let code = error.code().map(|c| c.to_string());
    assert_eq!(code.as_deref(), Some("cadence::config::validation"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error as &dyn Diagnostic)
        .unwrap();
    assert!(buf.contains("sweep_interval_ms"));
}
