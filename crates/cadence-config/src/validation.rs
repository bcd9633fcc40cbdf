// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive intervals, and timing relationships.

use crate::diagnostic::ConfigError;
use crate::model::{CadenceConfig, StateBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CadenceConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if let Some(id) = &config.service.instance_id
        && id.trim().is_empty()
    {
        fail("service.instance_id must not be empty when set".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.state.backend == StateBackend::Sqlite && config.state.database_path.trim().is_empty()
    {
        fail("state.database_path must not be empty for the sqlite backend".to_string());
    }

    if config.debounce.sweep_interval_ms == 0 {
        fail("debounce.sweep_interval_ms must be greater than 0".to_string());
    }

    if config.debounce.quiet_period_ms < config.debounce.sweep_interval_ms {
        fail(format!(
            "debounce.quiet_period_ms ({}) must be at least debounce.sweep_interval_ms ({})",
            config.debounce.quiet_period_ms, config.debounce.sweep_interval_ms
        ));
    }

    if config.followup.poll_interval_secs == 0 {
        fail("followup.poll_interval_secs must be greater than 0".to_string());
    }

    if config.followup.batch_size == 0 {
        fail("followup.batch_size must be greater than 0".to_string());
    }

    if config.followup.default_lead_name.trim().is_empty() {
        fail("followup.default_lead_name must not be empty".to_string());
    }

    if config.dispatch.max_concurrent == 0 {
        fail("dispatch.max_concurrent must be at least 1".to_string());
    }

    if config.responder.timeout_secs == 0 {
        fail("responder.timeout_secs must be greater than 0".to_string());
    }

    if config.dispatch.lock_ttl_secs <= config.responder.timeout_secs {
        fail(format!(
            "dispatch.lock_ttl_secs ({}) must exceed responder.timeout_secs ({})",
            config.dispatch.lock_ttl_secs, config.responder.timeout_secs
        ));
    }

    if let Some(endpoint) = &config.responder.endpoint
        && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        fail(format!(
            "responder.endpoint `{endpoint}` must start with http:// or https://"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
