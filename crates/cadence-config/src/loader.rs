// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cadence.toml` > `~/.config/cadence/cadence.toml` > `/etc/cadence/cadence.toml`
//! with environment variable overrides via `CADENCE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CadenceConfig;

/// Sections recognised in `CADENCE_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "state",
    "debounce",
    "followup",
    "dispatch",
    "responder",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cadence/cadence.toml` (system-wide)
/// 3. `~/.config/cadence/cadence.toml` (user XDG config)
/// 4. `./cadence.toml` (local directory)
/// 5. `CADENCE_*` environment variables
pub fn load_config() -> Result<CadenceConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CadenceConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CadenceConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::file("/etc/cadence/cadence.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cadence/cadence.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cadence.toml"))
        .merge(env_provider())
}

/// Map an env key (prefix stripped, lowercased) to a dotted config path.
///
/// Only the first underscore after a known section becomes a dot, so
/// `debounce_quiet_period_ms` maps to `debounce.quiet_period_ms`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        let prefix = format!("{section}_");
        if key.starts_with(&prefix) {
            return key.replacen(&prefix, &format!("{section}."), 1);
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: keys such as `quiet_period_ms`
/// contain underscores of their own.
fn env_provider() -> Env {
    Env::prefixed("CADENCE_").map(|key| map_env_key(key.as_str()).into())
}
