// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation buffering, the quiet-period sweep, and the flush.
//!
//! A flush takes the conversation lease, drops the id from the active set,
//! and takes the buffer in one step before the responder is called. A
//! fragment that lands after the take re-adds the id and starts a new unit
//! of work.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cadence_config::model::DebounceConfig;
use cadence_core::types::PendingResponse;
use cadence_core::{
    CadenceError, Clock, ConversationLease, Directory, DispatchPool, QueuedGuard, QueuedIds,
    Responder, StateStore,
};

use crate::merge::merge_fragments;

/// What a single flush attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The merged text went to the responder.
    Dispatched,
    /// Another dispatch holds the conversation; retried on a later sweep.
    Locked,
    /// Nothing was buffered, usually because a concurrent flush won.
    Empty,
    /// The conversation or its company no longer exists; the text is dropped.
    Abandoned,
    /// The responder rejected the merged text. Not retried.
    Failed,
}

/// Debounce/merge aggregator. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct DebounceAggregator {
    state: Arc<dyn StateStore>,
    lease: ConversationLease,
    directory: Arc<dyn Directory>,
    responder: Arc<dyn Responder>,
    clock: Arc<dyn Clock>,
    pool: DispatchPool,
    quiet_period: chrono::Duration,
    sweep_interval: Duration,
    /// Ids with a flush already queued on this instance.
    scheduled: QueuedIds,
}

impl DebounceAggregator {
    pub fn new(
        state: Arc<dyn StateStore>,
        lease: ConversationLease,
        directory: Arc<dyn Directory>,
        responder: Arc<dyn Responder>,
        clock: Arc<dyn Clock>,
        pool: DispatchPool,
        config: &DebounceConfig,
    ) -> Self {
        Self {
            state,
            lease,
            directory,
            responder,
            clock,
            pool,
            quiet_period: chrono::Duration::milliseconds(
                i64::try_from(config.quiet_period_ms).unwrap_or(i64::MAX),
            ),
            sweep_interval: Duration::from_millis(config.sweep_interval_ms.max(1)),
            scheduled: QueuedIds::new(),
        }
    }

    pub fn quiet_period(&self) -> chrono::Duration {
        self.quiet_period
    }

    /// Buffer one inbound fragment and restart the conversation's silence timer.
    pub async fn on_inbound_fragment(
        &self,
        conversation_id: &str,
        company_id: &str,
        lead_name: &str,
        text: &str,
    ) -> Result<(), CadenceError> {
        let pending = PendingResponse {
            conversation_id: conversation_id.to_string(),
            company_id: company_id.to_string(),
            lead_name: lead_name.to_string(),
        };
        self.state
            .append_fragment(&pending, text, self.clock.now())
            .await?;
        debug!(conversation_id, company_id, "fragment buffered");
        Ok(())
    }

    /// Queue a flush for every active conversation that has been quiet long
    /// enough. Returns how many flushes were queued.
    ///
    /// An active id without a timer is flushed as well so its leftovers get
    /// cleaned up.
    pub async fn sweep(&self) -> Result<usize, CadenceError> {
        let active = self.state.active_conversations().await?;
        if active.is_empty() {
            return Ok(0);
        }

        let now = self.clock.now();
        let mut queued = 0;
        for conversation_id in active {
            if self.scheduled.contains(&conversation_id) {
                continue;
            }
            let last = match self.state.last_activity(&conversation_id).await {
                Ok(last) => last,
                Err(e) => {
                    warn!(conversation_id = %conversation_id, error = %e, "failed to read silence timer");
                    continue;
                }
            };
            if !self.is_quiet(last, now) {
                continue;
            }
            if let Some(queued_id) = self.scheduled.try_queue(&conversation_id) {
                self.spawn_flush(queued_id);
                queued += 1;
            }
        }
        Ok(queued)
    }

    fn is_quiet(&self, last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_activity {
            Some(at) => now - at >= self.quiet_period,
            None => true,
        }
    }

    fn spawn_flush(&self, queued: QueuedGuard) {
        let this = self.clone();
        self.pool.spawn(async move {
            let conversation_id = queued.id();
            match this.flush(conversation_id).await {
                Ok(outcome) => debug!(conversation_id, ?outcome, "flush finished"),
                Err(e) => warn!(conversation_id, error = %e, "flush failed"),
            }
        });
    }

    /// Flush one conversation now, regardless of its timer.
    pub async fn flush(&self, conversation_id: &str) -> Result<FlushOutcome, CadenceError> {
        let Some(guard) = self.lease.try_acquire(conversation_id).await? else {
            debug!(conversation_id, "flush skipped, conversation lease held");
            return Ok(FlushOutcome::Locked);
        };
        let outcome = self.flush_locked(conversation_id).await;
        guard.release().await;
        outcome
    }

    async fn flush_locked(&self, conversation_id: &str) -> Result<FlushOutcome, CadenceError> {
        self.state.remove_active(conversation_id).await?;

        let buffer = self.state.take_pending(conversation_id).await?;
        let Some(pending) = buffer.metadata else {
            return Ok(FlushOutcome::Empty);
        };
        let merged = merge_fragments(&buffer.fragments);
        if merged.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let conversation = self.directory.resolve_conversation(conversation_id).await?;
        let company = self.directory.resolve_company(&pending.company_id).await?;
        let (Some(conversation), Some(_company)) = (conversation, company) else {
            warn!(
                conversation_id,
                company_id = %pending.company_id,
                "conversation or company gone, dropping merged text"
            );
            return Ok(FlushOutcome::Abandoned);
        };

        match self
            .responder
            .respond(&conversation, &merged, &pending.lead_name)
            .await
        {
            Ok(()) => {
                info!(
                    conversation_id,
                    company_id = %pending.company_id,
                    fragments = buffer.fragments.len(),
                    "merged reply dispatched"
                );
                Ok(FlushOutcome::Dispatched)
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "responder rejected merged text");
                Ok(FlushOutcome::Failed)
            }
        }
    }

    /// Sweep on a fixed period until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            sweep_ms = self.sweep_interval.as_millis() as u64,
            quiet_ms = self.quiet_period.num_milliseconds(),
            "debounce sweep started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(0) => {}
                        Ok(queued) => debug!(queued, "debounce sweep queued flushes"),
                        Err(e) => warn!(error = %e, "debounce sweep failed (non-fatal)"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("debounce sweep shutting down");
                    break;
                }
            }
        }
    }
}
