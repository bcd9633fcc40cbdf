// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up step scheduler.
//!
//! Each poll reads the due candidates and queues one dispatch per
//! conversation on the pool. A dispatch takes the conversation lease,
//! re-reads the status, and only then decides. Deferrals and exhaustion are
//! compare-and-sets on the version it validated. A send first claims the
//! step by clearing its due instant; the advance afterwards is written
//! against that claim, so an operator reply or a pause landing mid-send is
//! kept and the step still goes out once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cadence_config::model::FollowUpSettings;
use cadence_core::types::{
    ActivityEvent, ActivityOrigin, FollowUpStatus, StepSettlement, SupportMode,
};
use cadence_core::{
    CadenceError, Clock, ConversationLease, Directory, DispatchPool, FollowUpStore, QueuedIds,
    Responder,
};

use crate::template::{step_content, TemplateVars};
use crate::tracker::FollowUpTracker;
use crate::window::BusinessWindow;

/// What one dispatch attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A step was sent; `count` is the new follow-up count.
    Sent { count: u32 },
    /// Another dispatch holds the conversation.
    Locked,
    /// The row no longer qualifies: paused, ineligible, not yet due, or disabled.
    Stale,
    /// Outside business hours; rescheduled to the next window start.
    Deferred { until: DateTime<Utc> },
    /// No step left; the conversation is no longer eligible.
    Exhausted,
    /// A human agent owns the conversation; nothing is scheduled until the
    /// next tracked activity.
    HumanSupport,
    /// The conversation or its company is gone; the conversation is no longer eligible.
    Missing,
    /// The responder rejected the step; retried on a later poll.
    Failed,
}

#[derive(Clone)]
pub struct FollowUpScheduler {
    tracker: FollowUpTracker,
    directory: Arc<dyn Directory>,
    responder: Arc<dyn Responder>,
    lease: ConversationLease,
    pool: DispatchPool,
    poll_interval: Duration,
    batch_size: usize,
    default_lead_name: String,
    /// Ids with a dispatch already queued on this instance.
    scheduled: QueuedIds,
}

impl FollowUpScheduler {
    pub fn new(
        tracker: FollowUpTracker,
        directory: Arc<dyn Directory>,
        responder: Arc<dyn Responder>,
        lease: ConversationLease,
        pool: DispatchPool,
        settings: &FollowUpSettings,
    ) -> Self {
        Self {
            tracker,
            directory,
            responder,
            lease,
            pool,
            poll_interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
            batch_size: settings.batch_size.max(1),
            default_lead_name: settings.default_lead_name.clone(),
            scheduled: QueuedIds::new(),
        }
    }

    fn store(&self) -> &Arc<dyn FollowUpStore> {
        self.tracker.store()
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        self.tracker.clock()
    }

    /// Queue a dispatch for every due candidate, oldest-due first.
    /// Returns how many were queued.
    pub async fn poll_once(&self) -> Result<usize, CadenceError> {
        let now = self.clock().now();
        let due = self.store().due_statuses(now, self.batch_size).await?;

        let mut queued = 0;
        for status in due {
            let conversation_id = status.conversation_id;
            let Some(slot) = self.scheduled.try_queue(&conversation_id) else {
                continue;
            };
            let this = self.clone();
            self.pool.spawn(async move {
                let _slot = slot;
                match this.process_one(&conversation_id).await {
                    Ok(outcome) => {
                        debug!(conversation_id = %conversation_id, ?outcome, "follow-up dispatch finished")
                    }
                    Err(e) => {
                        warn!(conversation_id = %conversation_id, error = %e, "follow-up dispatch failed")
                    }
                }
            });
            queued += 1;
        }
        Ok(queued)
    }

    /// Evaluate and, if still due, send the next step for one conversation.
    pub async fn process_one(&self, conversation_id: &str) -> Result<DispatchOutcome, CadenceError> {
        let Some(guard) = self.lease.try_acquire(conversation_id).await? else {
            debug!(conversation_id, "follow-up skipped, conversation lease held");
            return Ok(DispatchOutcome::Locked);
        };
        let outcome = self.process_locked(conversation_id).await;
        guard.release().await;
        outcome
    }

    async fn process_locked(&self, conversation_id: &str) -> Result<DispatchOutcome, CadenceError> {
        let now = self.clock().now();

        // Re-validate: the row may have changed since the due query.
        let Some(status) = self.store().get_status(conversation_id).await? else {
            return Ok(DispatchOutcome::Stale);
        };
        let due = status.next_follow_up_at.is_some_and(|next| next <= now);
        if status.paused || !status.eligible || !due {
            debug!(conversation_id, "follow-up candidate no longer due");
            return Ok(DispatchOutcome::Stale);
        }
        let config = match self.store().get_config(&status.company_id).await? {
            Some(config) if config.enabled => config,
            _ => return Ok(DispatchOutcome::Stale),
        };

        let window = BusinessWindow::from_config(&config)?;
        if !window.contains(now) {
            let until = window.next_open(now);
            let deferred = FollowUpStatus {
                next_follow_up_at: Some(until),
                ..status
            };
            self.write(&deferred, "deferral").await?;
            debug!(conversation_id, %until, "outside business hours, follow-up deferred");
            return Ok(DispatchOutcome::Deferred { until });
        }

        let active = config.active_steps();
        let index = status.follow_up_count as usize;
        let Some(step) = active.get(index).copied() else {
            self.write(&ineligible(status), "exhaustion").await?;
            info!(conversation_id, "follow-up cadence exhausted");
            return Ok(DispatchOutcome::Exhausted);
        };

        let conversation = self.directory.resolve_conversation(conversation_id).await?;
        let company = match &conversation {
            Some(c) => self.directory.resolve_company(&c.company_id).await?,
            None => None,
        };
        let (Some(conversation), Some(company)) = (conversation, company) else {
            warn!(conversation_id, "conversation or company gone, follow-up dropped");
            self.write(&ineligible(status), "missing entity").await?;
            return Ok(DispatchOutcome::Missing);
        };

        if conversation.support_mode == SupportMode::Human {
            let idle = FollowUpStatus {
                next_follow_up_at: None,
                ..status
            };
            self.write(&idle, "human support").await?;
            debug!(conversation_id, "human support active, follow-up skipped");
            return Ok(DispatchOutcome::HumanSupport);
        }

        let lead_name = conversation.lead_name(&self.default_lead_name);
        let content = step_content(
            step,
            &TemplateVars {
                lead_name: &lead_name,
                company_name: &company.name,
                phone_number: conversation.phone_number.as_deref().unwrap_or(""),
            },
        );

        // Claim the step: with nothing scheduled no other dispatch picks it,
        // and writes racing the send no longer decide whether it advances.
        let claimed_count = status.follow_up_count;
        let claimed = FollowUpStatus {
            next_follow_up_at: None,
            ..status.clone()
        };
        if !self.write(&claimed, "claim").await? {
            return Ok(DispatchOutcome::Stale);
        }

        if let Err(e) = self
            .responder
            .send_follow_up(&conversation, &content, &lead_name)
            .await
        {
            warn!(
                conversation_id,
                step = step.step_order,
                error = %e,
                "follow-up send failed, will retry"
            );
            let restore = StepSettlement {
                conversation_id: conversation_id.to_string(),
                claimed_count,
                follow_up_count: claimed_count,
                last_follow_up_at: status.last_follow_up_at,
                next_follow_up_at: status.next_follow_up_at,
                eligible: true,
            };
            self.settle(&restore, "restore").await?;
            return Ok(DispatchOutcome::Failed);
        }

        let count = claimed_count + 1;
        let next_step = active.get(index + 1);
        let advance = StepSettlement {
            conversation_id: conversation_id.to_string(),
            claimed_count,
            follow_up_count: count,
            last_follow_up_at: Some(now),
            next_follow_up_at: next_step.map(|s| now + s.delay()),
            eligible: next_step.is_some(),
        };
        self.settle(&advance, "advance").await?;
        info!(
            conversation_id,
            company_id = %status.company_id,
            step = step.step_order,
            count,
            "follow-up sent"
        );

        self.tracker
            .record_activity(&ActivityEvent {
                conversation_id: conversation_id.to_string(),
                company_id: status.company_id.clone(),
                origin: ActivityOrigin::FollowUp,
                at: now,
            })
            .await?;

        Ok(DispatchOutcome::Sent { count })
    }

    /// Write the outcome of a claimed step. The claim is gone when contact
    /// or responder activity restarted or cancelled the cadence meanwhile;
    /// that newer schedule stands.
    async fn settle(&self, settlement: &StepSettlement, what: &str) -> Result<bool, CadenceError> {
        let settled = self.store().settle_claim(settlement).await?;
        if !settled {
            debug!(
                conversation_id = %settlement.conversation_id,
                what,
                "cadence rescheduled during dispatch, claim dropped"
            );
        }
        Ok(settled)
    }

    /// Compare-and-set; losing the race is logged, not an error.
    async fn write(&self, status: &FollowUpStatus, what: &str) -> Result<bool, CadenceError> {
        let written = self.store().compare_and_set_status(status).await?;
        if !written {
            warn!(
                conversation_id = %status.conversation_id,
                what,
                "follow-up status changed concurrently, write skipped"
            );
        }
        Ok(written)
    }

    /// Poll on a fixed period until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            poll_secs = self.poll_interval.as_secs(),
            batch = self.batch_size,
            "follow-up scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.poll_once().await {
                        Ok(0) => {}
                        Ok(queued) => info!(queued, "follow-up poll queued dispatches"),
                        Err(e) => warn!(error = %e, "follow-up poll failed (non-fatal)"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("follow-up scheduler shutting down");
                    break;
                }
            }
        }
    }
}

fn ineligible(status: FollowUpStatus) -> FollowUpStatus {
    FollowUpStatus {
        eligible: false,
        next_follow_up_at: None,
        ..status
    }
}
