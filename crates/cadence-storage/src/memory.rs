// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process state store for a single scheduler instance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use cadence_core::types::{PendingBuffer, PendingResponse};
use cadence_core::{
    AdapterType, CadenceError, ConversationLock, HealthStatus, PluginAdapter, StateStore,
};

#[derive(Debug, Default)]
struct BufferEntry {
    fragments: Vec<String>,
    metadata: Option<PendingResponse>,
    last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct Lease {
    owner: String,
    expires_at: DateTime<Utc>,
}

/// [`StateStore`] and [`ConversationLock`] over concurrent maps.
///
/// Per-key operations are atomic through the map's shard locks. The state
/// is lost on restart and invisible to other processes.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    buffers: DashMap<String, BufferEntry>,
    active: DashSet<String>,
    leases: DashMap<String, Lease>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStateStore {
    fn name(&self) -> &str {
        "memory-state"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::StateStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn append_fragment(
        &self,
        pending: &PendingResponse,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        {
            let mut entry = self
                .buffers
                .entry(pending.conversation_id.clone())
                .or_default();
            entry.fragments.push(text.to_string());
            entry.metadata = Some(pending.clone());
            entry.last_activity = Some(at);
        }
        self.active.insert(pending.conversation_id.clone());
        Ok(())
    }

    async fn active_conversations(&self) -> Result<Vec<String>, CadenceError> {
        let mut ids: Vec<String> = self.active.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn last_activity(
        &self,
        conversation_id: &str,
    ) -> Result<Option<DateTime<Utc>>, CadenceError> {
        Ok(self
            .buffers
            .get(conversation_id)
            .and_then(|entry| entry.last_activity))
    }

    async fn remove_active(&self, conversation_id: &str) -> Result<bool, CadenceError> {
        Ok(self.active.remove(conversation_id).is_some())
    }

    async fn take_pending(&self, conversation_id: &str) -> Result<PendingBuffer, CadenceError> {
        Ok(self
            .buffers
            .remove(conversation_id)
            .map(|(_, entry)| PendingBuffer {
                fragments: entry.fragments,
                metadata: entry.metadata,
            })
            .unwrap_or_default())
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), CadenceError> {
        self.buffers.remove(conversation_id);
        self.active.remove(conversation_id);
        Ok(())
    }
}

#[async_trait]
impl ConversationLock for MemoryStateStore {
    async fn try_lock(
        &self,
        conversation_id: &str,
        owner: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, CadenceError> {
        let lease = Lease {
            owner: owner.to_string(),
            expires_at,
        };
        match self.leases.entry(conversation_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(lease);
                Ok(true)
            }
            Entry::Occupied(mut slot) if slot.get().expires_at <= now => {
                slot.insert(lease);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn unlock(&self, conversation_id: &str, owner: &str) -> Result<(), CadenceError> {
        self.leases
            .remove_if(conversation_id, |_, lease| lease.owner == owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn pending(id: &str) -> PendingResponse {
        PendingResponse {
            conversation_id: id.into(),
            company_id: "co-1".into(),
            lead_name: "Ana".into(),
        }
    }

    #[tokio::test]
    async fn buffer_lifecycle() {
        let store = MemoryStateStore::new();
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();

        store.append_fragment(&pending("b"), "um", at).await.unwrap();
        store.append_fragment(&pending("a"), "dois", at).await.unwrap();
        store.append_fragment(&pending("a"), "tres", at + Duration::seconds(2)).await.unwrap();

        assert_eq!(store.active_conversations().await.unwrap(), vec!["a", "b"]);
        assert_eq!(
            store.last_activity("a").await.unwrap(),
            Some(at + Duration::seconds(2))
        );

        let taken = store.take_pending("a").await.unwrap();
        assert_eq!(taken.fragments, vec!["dois", "tres"]);
        assert!(store.take_pending("a").await.unwrap().is_empty());
        assert!(store.remove_active("a").await.unwrap());

        store.clear("b").await.unwrap();
        assert!(store.active_conversations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lease_respects_owner_and_expiry() {
        let store = MemoryStateStore::new();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let ttl = Duration::seconds(10);

        assert!(store.try_lock("c", "x", now + ttl, now).await.unwrap());
        assert!(!store.try_lock("c", "y", now + ttl, now).await.unwrap());

        store.unlock("c", "y").await.unwrap();
        assert!(!store.try_lock("c", "y", now + ttl, now).await.unwrap());

        let expired = now + ttl;
        assert!(store.try_lock("c", "y", expired + ttl, expired).await.unwrap());
    }
}
