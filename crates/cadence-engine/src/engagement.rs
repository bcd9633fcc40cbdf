// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point for inbound traffic and operator-side activity.
//!
//! Ingestion is fire-and-forget: failures are logged, never returned, so
//! the webhook layer feeding this never has to handle scheduler errors.
//! Deduplication by provider message id happens before this point.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use cadence_core::types::{ActivityEvent, ActivityOrigin};
use cadence_core::Clock;
use cadence_debounce::DebounceAggregator;
use cadence_followup::FollowUpTracker;

/// One received contact message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundEvent {
    pub conversation_id: String,
    pub company_id: String,
    /// Contact display name, if the channel provides one.
    #[serde(default)]
    pub lead_name: Option<String>,
    pub text: String,
    /// When the provider received the message; defaults to now.
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct Engagement {
    aggregator: DebounceAggregator,
    tracker: FollowUpTracker,
    clock: Arc<dyn Clock>,
    default_lead_name: String,
    debounce_enabled: bool,
}

impl Engagement {
    pub fn new(
        aggregator: DebounceAggregator,
        tracker: FollowUpTracker,
        clock: Arc<dyn Clock>,
        default_lead_name: impl Into<String>,
        debounce_enabled: bool,
    ) -> Self {
        Self {
            aggregator,
            tracker,
            clock,
            default_lead_name: default_lead_name.into(),
            debounce_enabled,
        }
    }

    /// Track the message for follow-ups and buffer it for a merged reply.
    ///
    /// With debouncing disabled the fragment is flushed immediately.
    pub async fn ingest(&self, event: &InboundEvent) {
        let at = event.received_at.unwrap_or_else(|| self.clock.now());
        self.record(
            &event.conversation_id,
            &event.company_id,
            ActivityOrigin::Contact,
            at,
        )
        .await;

        let lead_name = event
            .lead_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.default_lead_name);
        if let Err(e) = self
            .aggregator
            .on_inbound_fragment(&event.conversation_id, &event.company_id, lead_name, &event.text)
            .await
        {
            warn!(
                conversation_id = %event.conversation_id,
                error = %e,
                "failed to buffer inbound fragment"
            );
            return;
        }

        if !self.debounce_enabled {
            match self.aggregator.flush(&event.conversation_id).await {
                Ok(outcome) => debug!(conversation_id = %event.conversation_id, ?outcome, "immediate flush"),
                Err(e) => warn!(conversation_id = %event.conversation_id, error = %e, "immediate flush failed"),
            }
        }
    }

    /// A human operator replied from outside the scheduler.
    pub async fn record_operator_reply(&self, conversation_id: &str, company_id: &str) {
        self.record(
            conversation_id,
            company_id,
            ActivityOrigin::Operator,
            self.clock.now(),
        )
        .await;
    }

    async fn record(
        &self,
        conversation_id: &str,
        company_id: &str,
        origin: ActivityOrigin,
        at: DateTime<Utc>,
    ) {
        let event = ActivityEvent {
            conversation_id: conversation_id.to_string(),
            company_id: company_id.to_string(),
            origin,
            at,
        };
        if let Err(e) = self.tracker.record_activity(&event).await {
            warn!(conversation_id, %origin, error = %e, "failed to record activity");
        }
    }
}
