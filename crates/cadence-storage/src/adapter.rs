// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the durable store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use cadence_config::model::StorageConfig;
use cadence_core::types::{
    ActivityUpdate, Company, Conversation, FollowUpConfig, FollowUpStatus, StepSettlement,
    SupportMode,
};
use cadence_core::{
    AdapterType, CadenceError, Directory, FollowUpStore, HealthStatus, PluginAdapter,
};

use crate::database::{self, Database, Schema};
use crate::queries;

/// SQLite-backed durable storage: follow-up configs, statuses, and the
/// company/conversation directory.
///
/// The database is opened by [`SqliteStorage::initialize`]; every other call
/// fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database file and run the durable migrations.
    pub async fn initialize(&self) -> Result<(), CadenceError> {
        let path = self.config.database_path.clone();
        let db = Database::open_schema(&path, Schema::Durable, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CadenceError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoint the WAL. The connection itself closes on drop.
    pub async fn close(&self) -> Result<(), CadenceError> {
        database::checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    fn db(&self) -> Result<&Database, CadenceError> {
        self.db.get().ok_or_else(|| CadenceError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    // --- Directory administration ---

    pub async fn upsert_company(&self, company: &Company) -> Result<(), CadenceError> {
        queries::directory::upsert_company(self.db()?, company).await
    }

    pub async fn upsert_conversation(&self, conversation: &Conversation) -> Result<(), CadenceError> {
        queries::directory::upsert_conversation(self.db()?, conversation).await
    }

    /// Returns `false` when the conversation does not exist.
    pub async fn set_support_mode(&self, id: &str, mode: SupportMode) -> Result<bool, CadenceError> {
        queries::directory::set_support_mode(self.db()?, id, mode).await
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<bool, CadenceError> {
        queries::directory::delete_conversation(self.db()?, id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::FollowUpStore
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
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl FollowUpStore for SqliteStorage {
    async fn get_config(&self, company_id: &str) -> Result<Option<FollowUpConfig>, CadenceError> {
        queries::followup::get_config(self.db()?, company_id).await
    }

    async fn save_config(&self, config: &FollowUpConfig) -> Result<(), CadenceError> {
        queries::followup::save_config(self.db()?, config).await
    }

    async fn get_status(
        &self,
        conversation_id: &str,
    ) -> Result<Option<FollowUpStatus>, CadenceError> {
        queries::followup::get_status(self.db()?, conversation_id).await
    }

    async fn list_statuses(&self, company_id: &str) -> Result<Vec<FollowUpStatus>, CadenceError> {
        queries::followup::list_statuses(self.db()?, company_id).await
    }

    async fn due_statuses(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FollowUpStatus>, CadenceError> {
        queries::followup::due_statuses(self.db()?, now, limit).await
    }

    async fn record_activity(
        &self,
        update: &ActivityUpdate,
    ) -> Result<FollowUpStatus, CadenceError> {
        queries::followup::record_activity(self.db()?, update).await
    }

    async fn set_paused(
        &self,
        conversation_id: &str,
        paused: bool,
    ) -> Result<Option<FollowUpStatus>, CadenceError> {
        queries::followup::set_paused(self.db()?, conversation_id, paused).await
    }

    async fn reset_status(
        &self,
        conversation_id: &str,
    ) -> Result<Option<FollowUpStatus>, CadenceError> {
        queries::followup::reset_status(self.db()?, conversation_id).await
    }

    async fn compare_and_set_status(&self, status: &FollowUpStatus) -> Result<bool, CadenceError> {
        queries::followup::compare_and_set_status(self.db()?, status).await
    }

    async fn settle_claim(&self, settlement: &StepSettlement) -> Result<bool, CadenceError> {
        queries::followup::settle_claim(self.db()?, settlement).await
    }
}

#[async_trait]
impl Directory for SqliteStorage {
    async fn resolve_conversation(&self, id: &str) -> Result<Option<Conversation>, CadenceError> {
        queries::directory::get_conversation(self.db()?, id).await
    }

    async fn resolve_company(&self, id: &str) -> Result<Option<Company>, CadenceError> {
        queries::directory::get_company(self.db()?, id).await
    }
}
