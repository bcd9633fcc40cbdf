// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable follow-up config and status storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ActivityUpdate, FollowUpConfig, FollowUpStatus, StepSettlement};

/// Durable storage for follow-up configs and per-conversation status.
///
/// Writes to a status row are single conditional statements keyed by
/// conversation id. Every write bumps the row's `version`.
#[async_trait]
pub trait FollowUpStore: PluginAdapter {
    /// The stored config for a tenant, with its steps in `step_order`.
    async fn get_config(&self, company_id: &str) -> Result<Option<FollowUpConfig>, CadenceError>;

    /// Replace a tenant's config and its whole step list.
    async fn save_config(&self, config: &FollowUpConfig) -> Result<(), CadenceError>;

    async fn get_status(
        &self,
        conversation_id: &str,
    ) -> Result<Option<FollowUpStatus>, CadenceError>;

    /// Every status row of a tenant.
    async fn list_statuses(&self, company_id: &str) -> Result<Vec<FollowUpStatus>, CadenceError>;

    /// Rows due at `now`, not paused, eligible, with an enabled config,
    /// oldest-due first.
    async fn due_statuses(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FollowUpStatus>, CadenceError>;

    /// Upsert a status row for a tracked activity and return the new row.
    async fn record_activity(
        &self,
        update: &ActivityUpdate,
    ) -> Result<FollowUpStatus, CadenceError>;

    /// Set the paused flag. A no-op (no version bump) when it already has
    /// that value. `None` if the row does not exist.
    async fn set_paused(
        &self,
        conversation_id: &str,
        paused: bool,
    ) -> Result<Option<FollowUpStatus>, CadenceError>;

    /// Restart the cadence: zero count, clear timestamps, eligible, unpaused.
    async fn reset_status(
        &self,
        conversation_id: &str,
    ) -> Result<Option<FollowUpStatus>, CadenceError>;

    /// Write the mutable fields of `status` only if the stored version is
    /// still `status.version`. Returns whether the write happened.
    async fn compare_and_set_status(&self, status: &FollowUpStatus) -> Result<bool, CadenceError>;

    /// Write a settlement only while the row still holds the claim: eligible,
    /// nothing scheduled, and `follow_up_count` equal to `claimed_count`.
    /// Paused and last-message fields are left as they are. Returns whether
    /// the write happened.
    async fn settle_claim(&self, settlement: &StepSettlement) -> Result<bool, CadenceError>;
}
