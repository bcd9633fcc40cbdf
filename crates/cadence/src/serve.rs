// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cadence serve` and `cadence status`.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use cadence_config::CadenceConfig;
use cadence_core::{CadenceError, HealthStatus, PluginAdapter, Responder};
use cadence_engine::{install_signal_handler, open_state, CadenceRuntime, Components};
use cadence_responder::WebhookResponder;

/// Runs the `cadence serve` command until SIGTERM or Ctrl+C.
pub async fn run_serve(config: CadenceConfig) -> Result<(), CadenceError> {
    init_tracing(&config.service.log_level);

    let runtime = build_runtime(config).await?;
    let cancel = install_signal_handler();
    runtime.run(cancel).await?;

    info!("cadence stopped");
    Ok(())
}

/// One adapter's health, for JSON output.
#[derive(Debug, Serialize)]
struct AdapterHealth {
    adapter: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl AdapterHealth {
    fn new(adapter: String, status: HealthStatus) -> Self {
        let (status, detail) = match status {
            HealthStatus::Healthy => ("healthy", None),
            HealthStatus::Degraded(detail) => ("degraded", Some(detail)),
            HealthStatus::Unhealthy(detail) => ("unhealthy", Some(detail)),
        };
        Self {
            adapter,
            status,
            detail,
        }
    }
}

/// Runs the `cadence status` command: health of storage and state.
pub async fn run_status(config: CadenceConfig) -> Result<(), CadenceError> {
    let storage = crate::admin::open_storage(&config).await?;
    let (state, _) = open_state(&config).await?;

    let report = vec![
        AdapterHealth::new(storage.name().to_string(), settle(storage.health_check().await)),
        AdapterHealth::new(state.name().to_string(), settle(state.health_check().await)),
    ];
    crate::admin::print_json(&report)
}

fn settle(result: Result<HealthStatus, CadenceError>) -> HealthStatus {
    result.unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()))
}

/// Open every adapter and assemble the runtime. Fails when no responder
/// endpoint is configured.
pub async fn build_runtime(config: CadenceConfig) -> Result<CadenceRuntime, CadenceError> {
    let responder: Arc<dyn Responder> = Arc::new(WebhookResponder::new(&config.responder)?);
    let components = Components::from_config(&config, responder).await?;
    Ok(CadenceRuntime::assemble(components, config))
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cadence={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_detail_is_kept_for_failures() {
        let healthy = AdapterHealth::new("sqlite".into(), HealthStatus::Healthy);
        assert_eq!(healthy.status, "healthy");
        assert!(healthy.detail.is_none());

        let down = AdapterHealth::new("sqlite".into(), HealthStatus::Unhealthy("locked".into()));
        assert_eq!(down.status, "unhealthy");
        assert_eq!(down.detail.as_deref(), Some("locked"));
    }

    #[tokio::test]
    async fn runtime_requires_responder_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CadenceConfig::default();
        config.storage.database_path = dir.path().join("c.db").to_string_lossy().to_string();
        config.responder.endpoint = None;

        let err = build_runtime(config).await.err().unwrap();
        assert!(matches!(err, CadenceError::Config(_)));
    }
}
