// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock responder for deterministic testing.
//!
//! `MockResponder` records every reply and follow-up it is asked to send,
//! and can be switched into a failing mode or slowed down to widen races.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::traits::{PluginAdapter, Responder};
use cadence_core::types::{AdapterType, Conversation, FollowUpContent, HealthStatus};
use cadence_core::CadenceError;

/// One captured responder call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Reply {
        conversation_id: String,
        text: String,
        lead_name: String,
    },
    FollowUp {
        conversation_id: String,
        content: FollowUpContent,
        lead_name: String,
    },
}

impl SentMessage {
    pub fn conversation_id(&self) -> &str {
        match self {
            SentMessage::Reply { conversation_id, .. } => conversation_id,
            SentMessage::FollowUp { conversation_id, .. } => conversation_id,
        }
    }
}

pub struct MockResponder {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    /// Sleep for `delay` inside every call before recording it.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// While failing, calls are rejected and not recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Texts of captured replies, in call order.
    pub async fn replies(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|m| match m {
                SentMessage::Reply { text, .. } => Some(text.clone()),
                SentMessage::FollowUp { .. } => None,
            })
            .collect()
    }

    /// Captured follow-up contents, in call order.
    pub async fn follow_ups(&self) -> Vec<FollowUpContent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|m| match m {
                SentMessage::FollowUp { content, .. } => Some(content.clone()),
                SentMessage::Reply { .. } => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }

    async fn record(&self, message: SentMessage) -> Result<(), CadenceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CadenceError::Responder {
                message: "mock responder set to fail".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockResponder {
    fn name(&self) -> &str {
        "mock-responder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Responder
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(
        &self,
        conversation: &Conversation,
        text: &str,
        lead_name: &str,
    ) -> Result<(), CadenceError> {
        self.record(SentMessage::Reply {
            conversation_id: conversation.id.clone(),
            text: text.to_string(),
            lead_name: lead_name.to_string(),
        })
        .await
    }

    async fn send_follow_up(
        &self,
        conversation: &Conversation,
        content: &FollowUpContent,
        lead_name: &str,
    ) -> Result<(), CadenceError> {
        self.record(SentMessage::FollowUp {
            conversation_id: conversation.id.clone(),
            content: content.clone(),
            lead_name: lead_name.to_string(),
        })
        .await
    }
}
