// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up status tracker and operator controls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use cadence_core::types::{
    ActivityEvent, ActivityUpdate, FollowUpConfig, FollowUpState, FollowUpStatus, Schedule,
};
use cadence_core::{CadenceError, Clock, FollowUpStore};

use crate::validation::validate_follow_up_config;

/// Attempts at a compare-and-set before giving up on a contended row.
const CAS_ATTEMPTS: usize = 5;

/// A status row with its derived scheduling state, for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpStatusView {
    #[serde(flatten)]
    pub status: FollowUpStatus,
    pub state: FollowUpState,
}

/// Keeps follow-up statuses current as activity is recorded.
#[derive(Clone)]
pub struct FollowUpTracker {
    store: Arc<dyn FollowUpStore>,
    clock: Arc<dyn Clock>,
}

impl FollowUpTracker {
    pub fn new(store: Arc<dyn FollowUpStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn FollowUpStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Record one message event and reschedule accordingly.
    ///
    /// Contact and responder activity consult the tenant's triggers: a
    /// trigger that is on restarts the cadence, one that is off cancels it.
    /// Operator and follow-up activity only refresh the last-message fields.
    pub async fn record_activity(
        &self,
        event: &ActivityEvent,
    ) -> Result<FollowUpStatus, CadenceError> {
        let schedule = if event.origin.is_triggering() {
            match self.store.get_config(&event.company_id).await? {
                Some(config) if config.enabled => {
                    if config.triggers_on(event.origin) {
                        Schedule::Arm {
                            next: event.at + config.first_delay(),
                        }
                    } else {
                        Schedule::Cancel
                    }
                }
                _ => Schedule::Idle,
            }
        } else {
            Schedule::Touch
        };

        let status = self
            .store
            .record_activity(&ActivityUpdate {
                conversation_id: event.conversation_id.clone(),
                company_id: event.company_id.clone(),
                at: event.at,
                direction: event.origin.direction(),
                schedule,
            })
            .await?;
        debug!(
            conversation_id = %event.conversation_id,
            origin = %event.origin,
            ?schedule,
            "activity recorded"
        );
        Ok(status)
    }

    /// Pause automatic follow-ups. Pausing twice is the same as once.
    pub async fn pause(&self, conversation_id: &str) -> Result<Option<FollowUpStatus>, CadenceError> {
        let status = self.store.set_paused(conversation_id, true).await?;
        if status.is_some() {
            info!(conversation_id, "follow-up paused");
        }
        Ok(status)
    }

    /// Unpause and, when a step was pending at the pause, recompute its due
    /// instant as if the conversation had never been paused. A row with
    /// nothing scheduled stays unscheduled.
    pub async fn resume(
        &self,
        conversation_id: &str,
    ) -> Result<Option<FollowUpStatus>, CadenceError> {
        for _ in 0..CAS_ATTEMPTS {
            let Some(current) = self.store.get_status(conversation_id).await? else {
                return Ok(None);
            };
            if !current.paused {
                return Ok(Some(current));
            }
            let config = self.get_config(&current.company_id).await?;

            let mut resumed = current.clone();
            resumed.paused = false;
            if resumed.eligible && config.enabled && current.next_follow_up_at.is_some() {
                resumed.next_follow_up_at = next_due(&resumed, &config);
            }
            if self.store.compare_and_set_status(&resumed).await? {
                resumed.version += 1;
                info!(conversation_id, next = ?resumed.next_follow_up_at, "follow-up resumed");
                return Ok(Some(resumed));
            }
            debug!(conversation_id, "status changed during resume, retrying");
        }
        Err(CadenceError::Internal(format!(
            "follow-up status {conversation_id} kept changing during resume"
        )))
    }

    /// Restart the cadence from scratch.
    pub async fn reset(&self, conversation_id: &str) -> Result<Option<FollowUpStatus>, CadenceError> {
        let status = self.store.reset_status(conversation_id).await?;
        if status.is_some() {
            info!(conversation_id, "follow-up reset");
        }
        Ok(status)
    }

    /// The stored config, or the defaults when the tenant never saved one.
    pub async fn get_config(&self, company_id: &str) -> Result<FollowUpConfig, CadenceError> {
        Ok(self
            .store
            .get_config(company_id)
            .await?
            .unwrap_or_else(|| FollowUpConfig::defaults_for(company_id)))
    }

    /// Validate and replace a tenant's config and step list.
    pub async fn save_config(&self, config: &FollowUpConfig) -> Result<(), CadenceError> {
        validate_follow_up_config(config)?;
        self.store.save_config(config).await?;
        info!(
            company_id = %config.company_id,
            enabled = config.enabled,
            steps = config.steps.len(),
            "follow-up config saved"
        );
        Ok(())
    }

    /// Every status of a tenant with its derived state, soonest due first.
    pub async fn list_statuses(
        &self,
        company_id: &str,
    ) -> Result<Vec<FollowUpStatusView>, CadenceError> {
        let config = self.get_config(company_id).await?;
        let now = self.clock.now();
        let statuses = self.store.list_statuses(company_id).await?;
        Ok(statuses
            .into_iter()
            .map(|status| FollowUpStatusView {
                state: status.state(&config, now),
                status,
            })
            .collect())
    }
}

/// When the step at index `follow_up_count` falls due, measured from the
/// last follow-up or, before the first one, from the last message.
pub(crate) fn next_due(status: &FollowUpStatus, config: &FollowUpConfig) -> Option<DateTime<Utc>> {
    if status.follow_up_count == 0 {
        return status.last_message_at.map(|at| at + config.first_delay());
    }
    let active = config.active_steps();
    let step = active.get(status.follow_up_count as usize)?;
    status
        .last_follow_up_at
        .or(status.last_message_at)
        .map(|at| at + step.delay())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::FollowUpStep;
    use chrono::{Duration, TimeZone};

    fn step(order: u32, delay: i64) -> FollowUpStep {
        FollowUpStep {
            step_order: order,
            delay_minutes: delay,
            kind: cadence_core::types::StepKind::Template,
            template_body: Some("oi".into()),
            generation_prompt: None,
            active: true,
        }
    }

    #[test]
    fn next_due_anchors_on_the_right_timestamp() {
        let t = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let config = FollowUpConfig {
            enabled: true,
            steps: vec![step(1, 60), step(2, 120)],
            ..FollowUpConfig::defaults_for("co-1")
        };
        let mut status = FollowUpStatus {
            conversation_id: "conv-1".into(),
            company_id: "co-1".into(),
            last_message_at: Some(t),
            last_direction: None,
            follow_up_count: 0,
            last_follow_up_at: None,
            next_follow_up_at: None,
            paused: true,
            eligible: true,
            version: 3,
        };
        assert_eq!(next_due(&status, &config), Some(t + Duration::minutes(60)));

        status.follow_up_count = 1;
        status.last_follow_up_at = Some(t + Duration::minutes(60));
        assert_eq!(next_due(&status, &config), Some(t + Duration::minutes(180)));

        status.follow_up_count = 2;
        assert_eq!(next_due(&status, &config), None);
    }
}
