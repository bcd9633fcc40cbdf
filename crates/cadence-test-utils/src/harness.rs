// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end scheduling tests.
//!
//! `TestHarness` assembles a [`CadenceRuntime`] over a temp SQLite database,
//! the in-memory state backend, a [`ManualClock`], and a [`MockResponder`].
//! Loops are never spawned: tests step time with `advance()` and drive each
//! half with `sweep()` and `poll()`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use cadence_config::model::{CadenceConfig, StorageConfig};
use cadence_core::types::{FollowUpConfig, FollowUpStatus};
use cadence_core::{CadenceError, Clock, FollowUpStore, ManualClock};
use cadence_engine::{CadenceRuntime, Components, InboundEvent};
use cadence_storage::{MemoryStateStore, SqliteStorage};

use crate::fixtures;
use crate::mock_responder::MockResponder;

pub const COMPANY_ID: &str = "co-1";
pub const CONVERSATION_ID: &str = "conv-1";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: CadenceConfig,
    follow_up: Option<FollowUpConfig>,
    responder_delay: Option<Duration>,
    start: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = CadenceConfig::default();
        config.service.instance_id = Some("harness".to_string());
        Self {
            config,
            follow_up: None,
            responder_delay: None,
            start: fixtures::t0(),
        }
    }

    /// Set the debounce quiet period.
    pub fn with_quiet_period(mut self, quiet_period_ms: u64) -> Self {
        self.config.debounce.quiet_period_ms = quiet_period_ms;
        self
    }

    /// Turn debouncing off so every fragment is answered on its own.
    pub fn without_debounce(mut self) -> Self {
        self.config.debounce.enabled = false;
        self
    }

    /// Save this follow-up config for the seeded company.
    pub fn with_follow_up(mut self, config: FollowUpConfig) -> Self {
        self.follow_up = Some(config);
        self
    }

    /// Delay every mock send by `delay`.
    pub fn with_responder_delay(mut self, delay: Duration) -> Self {
        self.responder_delay = Some(delay);
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Build the harness, seeding company `co-1` and conversation `conv-1`.
    pub async fn build(self) -> Result<TestHarness, CadenceError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CadenceError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("cadence.db");

        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await?;
        storage.upsert_company(&fixtures::company(COMPANY_ID)).await?;
        storage
            .upsert_conversation(&fixtures::conversation(
                CONVERSATION_ID,
                COMPANY_ID,
                Some("Maria"),
            ))
            .await?;
        if let Some(follow_up) = &self.follow_up {
            storage.save_config(follow_up).await?;
        }

        let state = Arc::new(MemoryStateStore::new());
        let clock = Arc::new(ManualClock::new(self.start));
        let responder = Arc::new(match self.responder_delay {
            Some(delay) => MockResponder::with_delay(delay),
            None => MockResponder::new(),
        });

        let components = Components {
            store: storage.clone(),
            directory: storage.clone(),
            state: state.clone(),
            locks: state,
            responder: responder.clone(),
            clock: clock.clone(),
        };
        let runtime = CadenceRuntime::assemble(components, self.config);

        Ok(TestHarness {
            runtime,
            storage,
            responder,
            clock,
            _temp_dir: temp_dir,
        })
    }
}

/// Complete test environment for end-to-end scheduling tests.
pub struct TestHarness {
    pub runtime: CadenceRuntime,
    pub storage: Arc<SqliteStorage>,
    pub responder: Arc<MockResponder>,
    pub clock: Arc<ManualClock>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Move the manual clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }

    /// Ingest one contact message on the seeded conversation.
    pub async fn ingest(&self, text: &str) {
        self.ingest_event(InboundEvent {
            conversation_id: CONVERSATION_ID.to_string(),
            company_id: COMPANY_ID.to_string(),
            lead_name: Some("Maria".to_string()),
            text: text.to_string(),
            received_at: None,
        })
        .await;
    }

    pub async fn ingest_event(&self, event: InboundEvent) {
        self.runtime.engagement().ingest(&event).await;
        self.runtime.pool().drain().await;
    }

    /// Run one debounce sweep and wait for the flushes it queued.
    pub async fn sweep(&self) -> Result<usize, CadenceError> {
        let queued = self.runtime.aggregator().sweep().await?;
        self.runtime.pool().drain().await;
        Ok(queued)
    }

    /// Run one follow-up poll and wait for the dispatches it queued.
    pub async fn poll(&self) -> Result<usize, CadenceError> {
        let queued = self.runtime.scheduler().poll_once().await?;
        self.runtime.pool().drain().await;
        Ok(queued)
    }

    /// The seeded conversation's follow-up status.
    pub async fn status(&self) -> Result<Option<FollowUpStatus>, CadenceError> {
        self.storage.get_status(CONVERSATION_ID).await
    }
}
