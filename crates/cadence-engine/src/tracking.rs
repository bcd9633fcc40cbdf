// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Responder decorator that records automated replies as follow-up activity.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use cadence_core::types::{
    ActivityEvent, ActivityOrigin, AdapterType, Conversation, FollowUpContent, HealthStatus,
};
use cadence_core::{CadenceError, PluginAdapter, Responder};
use cadence_followup::FollowUpTracker;

/// Wraps a [`Responder`]. After each successful `respond`, records
/// [`ActivityOrigin::Responder`] activity so the tenant's outbound trigger
/// can arm the cadence. Follow-up sends pass straight through; the
/// scheduler records those itself.
pub struct TrackingResponder {
    inner: Arc<dyn Responder>,
    tracker: FollowUpTracker,
}

impl TrackingResponder {
    pub fn new(inner: Arc<dyn Responder>, tracker: FollowUpTracker) -> Self {
        Self { inner, tracker }
    }
}

#[async_trait]
impl PluginAdapter for TrackingResponder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Responder
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl Responder for TrackingResponder {
    async fn respond(
        &self,
        conversation: &Conversation,
        text: &str,
        lead_name: &str,
    ) -> Result<(), CadenceError> {
        self.inner.respond(conversation, text, lead_name).await?;

        let event = ActivityEvent {
            conversation_id: conversation.id.clone(),
            company_id: conversation.company_id.clone(),
            origin: ActivityOrigin::Responder,
            at: self.tracker.clock().now(),
        };
        // The reply went out; a tracking failure must not turn it into a send failure.
        if let Err(e) = self.tracker.record_activity(&event).await {
            warn!(
                conversation_id = %conversation.id,
                error = %e,
                "failed to record responder activity"
            );
        }
        Ok(())
    }

    async fn send_follow_up(
        &self,
        conversation: &Conversation,
        content: &FollowUpContent,
        lead_name: &str,
    ) -> Result<(), CadenceError> {
        self.inner.send_follow_up(conversation, content, lead_name).await
    }
}
