// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory company and conversation directory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::traits::{Directory, PluginAdapter};
use cadence_core::types::{AdapterType, Company, Conversation, HealthStatus, SupportMode};
use cadence_core::CadenceError;

#[derive(Default)]
pub struct MockDirectory {
    companies: Mutex<HashMap<String, Company>>,
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_company(&self, company: Company) {
        self.companies.lock().await.insert(company.id.clone(), company);
    }

    pub async fn insert_conversation(&self, conversation: Conversation) {
        self.conversations
            .lock()
            .await
            .insert(conversation.id.clone(), conversation);
    }

    pub async fn remove_conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations.lock().await.remove(id)
    }

    pub async fn set_support_mode(&self, id: &str, mode: SupportMode) {
        if let Some(conversation) = self.conversations.lock().await.get_mut(id) {
            conversation.support_mode = mode;
        }
    }
}

#[async_trait]
impl PluginAdapter for MockDirectory {
    fn name(&self) -> &str {
        "mock-directory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Directory
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn resolve_conversation(&self, id: &str) -> Result<Option<Conversation>, CadenceError> {
        Ok(self.conversations.lock().await.get(id).cloned())
    }

    async fn resolve_company(&self, id: &str) -> Result<Option<Company>, CadenceError> {
        Ok(self.companies.lock().await.get(id).cloned())
    }
}
