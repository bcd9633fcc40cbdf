// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cadence engagement scheduler.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Cadence configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Durable store for follow-up configs, statuses and the directory.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Shared transient state (buffers, timers, leases).
    #[serde(default)]
    pub state: StateConfig,

    /// Debounce aggregator timing.
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Follow-up scheduler loop.
    #[serde(default)]
    pub followup: FollowUpSettings,

    /// Dispatch pool and lease settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Outbound responder webhook.
    #[serde(default)]
    pub responder: ResponderConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Identifier used in lease owner tokens. A random id is used when unset.
    #[serde(default)]
    pub instance_id: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            instance_id: None,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Durable storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("cadence").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .to_string_lossy()
        .into_owned()
}

fn default_database_path() -> String {
    data_file("cadence.db")
}

fn default_wal_mode() -> bool {
    true
}

/// Which shared state implementation to run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// SQLite file, safe to share between processes.
    #[default]
    Sqlite,
    /// In-process maps; single instance only, lost on restart.
    Memory,
}

/// Shared transient state configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackend,

    /// SQLite file for the `sqlite` backend. May equal `storage.database_path`.
    #[serde(default = "default_state_database_path")]
    pub database_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::default(),
            database_path: default_state_database_path(),
        }
    }
}

fn default_state_database_path() -> String {
    data_file("cadence-state.db")
}

/// Debounce aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebounceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often the sweep checks the active set.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Silence required before a buffer is flushed.
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sweep_interval_ms: default_sweep_interval_ms(),
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_sweep_interval_ms() -> u64 {
    500
}

fn default_quiet_period_ms() -> u64 {
    3000
}

/// Follow-up scheduler loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum due candidates taken per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Name used for contacts without one.
    #[serde(default = "default_lead_name")]
    pub default_lead_name: String,
}

impl Default for FollowUpSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
            default_lead_name: default_lead_name(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> usize {
    200
}

fn default_lead_name() -> String {
    "cliente".to_string()
}

/// Dispatch pool and lease configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Upper bound on concurrent flushes plus follow-up sends.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Lease lifetime; must exceed the responder timeout.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            lock_ttl_secs: default_lock_ttl_secs(),
        }
    }
}

fn default_max_concurrent() -> usize {
    16
}

fn default_lock_ttl_secs() -> u64 {
    120
}

/// Outbound responder webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResponderConfig {
    /// Webhook URL receiving reply and follow-up requests.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
