// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the scheduler from config and runs both loops.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use cadence_config::model::{CadenceConfig, StateBackend};
use cadence_core::{
    CadenceError, Clock, ConversationLease, ConversationLock, Directory, DispatchPool,
    FollowUpStore, HealthStatus, PluginAdapter, Responder, StateStore, SystemClock,
};
use cadence_debounce::DebounceAggregator;
use cadence_followup::{FollowUpScheduler, FollowUpTracker};
use cadence_storage::{MemoryStateStore, SqliteStateStore, SqliteStorage};

use crate::engagement::Engagement;
use crate::tracking::TrackingResponder;

/// The adapters a runtime is assembled from.
#[derive(Clone)]
pub struct Components {
    pub store: Arc<dyn FollowUpStore>,
    pub directory: Arc<dyn Directory>,
    pub state: Arc<dyn StateStore>,
    pub locks: Arc<dyn ConversationLock>,
    pub responder: Arc<dyn Responder>,
    pub clock: Arc<dyn Clock>,
}

impl Components {
    /// Open the SQLite storage and the configured state backend.
    pub async fn from_config(
        config: &CadenceConfig,
        responder: Arc<dyn Responder>,
    ) -> Result<Self, CadenceError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let (state, locks) = open_state(config).await?;

        Ok(Self {
            store: storage.clone(),
            directory: storage,
            state,
            locks,
            responder,
            clock: Arc::new(SystemClock),
        })
    }
}

/// Open the configured shared state backend, returning it as both the
/// buffer store and the lease store.
pub async fn open_state(
    config: &CadenceConfig,
) -> Result<(Arc<dyn StateStore>, Arc<dyn ConversationLock>), CadenceError> {
    match config.state.backend {
        StateBackend::Sqlite => {
            let store = Arc::new(SqliteStateStore::new(
                config.state.clone(),
                config.storage.wal_mode,
            ));
            store.initialize().await?;
            let locks: Arc<dyn ConversationLock> = store.clone();
            let state: Arc<dyn StateStore> = store;
            Ok((state, locks))
        }
        StateBackend::Memory => {
            warn!("memory state backend: single instance only, state is lost on restart");
            let store = Arc::new(MemoryStateStore::new());
            let locks: Arc<dyn ConversationLock> = store.clone();
            let state: Arc<dyn StateStore> = store;
            Ok((state, locks))
        }
    }
}

pub struct CadenceRuntime {
    components: Components,
    config: CadenceConfig,
    pool: DispatchPool,
    tracker: FollowUpTracker,
    aggregator: DebounceAggregator,
    scheduler: FollowUpScheduler,
    engagement: Engagement,
}

impl CadenceRuntime {
    /// Wire both halves of the scheduler over shared components.
    ///
    /// The debounce flush and the follow-up dispatch share one lease and
    /// one dispatch pool.
    pub fn assemble(components: Components, config: CadenceConfig) -> Self {
        let instance_id = config
            .service
            .instance_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let lease = ConversationLease::new(
            components.locks.clone(),
            components.clock.clone(),
            instance_id.clone(),
            Duration::from_secs(config.dispatch.lock_ttl_secs),
        );
        let pool = DispatchPool::new(config.dispatch.max_concurrent);
        let tracker = FollowUpTracker::new(components.store.clone(), components.clock.clone());

        let tracking: Arc<dyn Responder> = Arc::new(TrackingResponder::new(
            components.responder.clone(),
            tracker.clone(),
        ));
        let aggregator = DebounceAggregator::new(
            components.state.clone(),
            lease.clone(),
            components.directory.clone(),
            tracking,
            components.clock.clone(),
            pool.clone(),
            &config.debounce,
        );
        let scheduler = FollowUpScheduler::new(
            tracker.clone(),
            components.directory.clone(),
            components.responder.clone(),
            lease,
            pool.clone(),
            &config.followup,
        );
        let engagement = Engagement::new(
            aggregator.clone(),
            tracker.clone(),
            components.clock.clone(),
            config.followup.default_lead_name.clone(),
            config.debounce.enabled,
        );

        info!(
            instance_id = %instance_id,
            max_concurrent = pool.max_concurrent(),
            "cadence runtime assembled"
        );

        Self {
            components,
            config,
            pool,
            tracker,
            aggregator,
            scheduler,
            engagement,
        }
    }

    pub fn engagement(&self) -> &Engagement {
        &self.engagement
    }

    pub fn tracker(&self) -> &FollowUpTracker {
        &self.tracker
    }

    pub fn aggregator(&self) -> &DebounceAggregator {
        &self.aggregator
    }

    pub fn scheduler(&self) -> &FollowUpScheduler {
        &self.scheduler
    }

    pub fn pool(&self) -> &DispatchPool {
        &self.pool
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Health of the durable store and the state backend.
    pub async fn health(&self) -> Vec<(String, HealthStatus)> {
        let store = &self.components.store;
        let state = &self.components.state;
        vec![
            (store.name().to_string(), settle(store.health_check().await)),
            (state.name().to_string(), settle(state.health_check().await)),
        ]
    }

    /// Run the enabled loops until `cancel` fires, then drain in-flight
    /// dispatches and shut the adapters down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CadenceError> {
        let mut loops = Vec::new();
        if self.config.debounce.enabled {
            let aggregator = self.aggregator.clone();
            let token = cancel.clone();
            loops.push(tokio::spawn(async move { aggregator.run(token).await }));
        }
        if self.config.followup.enabled {
            let scheduler = self.scheduler.clone();
            let token = cancel.clone();
            loops.push(tokio::spawn(async move { scheduler.run(token).await }));
        }
        info!(loops = loops.len(), "cadence running");

        cancel.cancelled().await;
        for handle in loops {
            if let Err(e) = handle.await {
                warn!(error = %e, "loop task ended abnormally");
            }
        }

        // One responder timeout bounds every dispatch still in flight.
        let grace = Duration::from_secs(self.config.responder.timeout_secs + 5);
        if self.pool.shutdown(grace).await {
            info!("in-flight dispatches drained");
        }

        self.shutdown_adapters().await;
        Ok(())
    }

    async fn shutdown_adapters(&self) {
        let results = [
            (self.components.responder.name(), self.components.responder.shutdown().await),
            (self.components.state.name(), self.components.state.shutdown().await),
            (self.components.store.name(), self.components.store.shutdown().await),
        ];
        for (adapter, result) in results {
            if let Err(e) = result {
                warn!(adapter, error = %e, "adapter shutdown failed");
            }
        }
    }
}

fn settle(result: Result<HealthStatus, CadenceError>) -> HealthStatus {
    result.unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()))
}
