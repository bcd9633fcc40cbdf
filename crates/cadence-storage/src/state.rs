// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed shared state: debounce buffers, timers, the active set,
//! and conversation leases.
//!
//! Several scheduler processes pointed at the same file share one view of
//! this state; every operation is a single statement or IMMEDIATE transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use cadence_config::model::StateConfig;
use cadence_core::types::{PendingBuffer, PendingResponse};
use cadence_core::{
    AdapterType, CadenceError, ConversationLock, HealthStatus, PluginAdapter, StateStore,
};

use crate::database::{self, Database, Schema};
use crate::queries;

pub struct SqliteStateStore {
    config: StateConfig,
    wal_mode: bool,
    db: OnceCell<Database>,
}

impl SqliteStateStore {
    pub fn new(config: StateConfig, wal_mode: bool) -> Self {
        Self {
            config,
            wal_mode,
            db: OnceCell::new(),
        }
    }

    /// Open the state file and run the state migrations.
    pub async fn initialize(&self) -> Result<(), CadenceError> {
        let path = self.config.database_path.clone();
        let db = Database::open_schema(&path, Schema::State, self.wal_mode).await?;
        self.db.set(db).map_err(|_| CadenceError::Storage {
            source: "state store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite state store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, CadenceError> {
        self.db.get().ok_or_else(|| CadenceError::Storage {
            source: "state store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStateStore {
    fn name(&self) -> &str {
        "sqlite-state"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::StateStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        if let Some(db) = self.db.get() {
            database::checkpoint(db.connection()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn append_fragment(
        &self,
        pending: &PendingResponse,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        queries::state::append_fragment(self.db()?, pending, text, at).await
    }

    async fn active_conversations(&self) -> Result<Vec<String>, CadenceError> {
        queries::state::active_ids(self.db()?).await
    }

    async fn last_activity(
        &self,
        conversation_id: &str,
    ) -> Result<Option<DateTime<Utc>>, CadenceError> {
        queries::state::last_activity(self.db()?, conversation_id).await
    }

    async fn remove_active(&self, conversation_id: &str) -> Result<bool, CadenceError> {
        queries::state::remove_active(self.db()?, conversation_id).await
    }

    async fn take_pending(&self, conversation_id: &str) -> Result<PendingBuffer, CadenceError> {
        queries::state::take_pending(self.db()?, conversation_id).await
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), CadenceError> {
        queries::state::clear(self.db()?, conversation_id).await
    }
}

#[async_trait]
impl ConversationLock for SqliteStateStore {
    async fn try_lock(
        &self,
        conversation_id: &str,
        owner: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, CadenceError> {
        queries::state::try_lock(self.db()?, conversation_id, owner, expires_at, now).await
    }

    async fn unlock(&self, conversation_id: &str, owner: &str) -> Result<(), CadenceError> {
        queries::state::unlock(self.db()?, conversation_id, owner).await
    }
}
