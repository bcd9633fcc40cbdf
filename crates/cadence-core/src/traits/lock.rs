// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expiring per-conversation mutual exclusion.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;

/// Storage for per-conversation leases.
///
/// A lease is held by an opaque owner token until it is released by that
/// owner or until `expires_at` passes. Acquisition never blocks.
#[async_trait]
pub trait ConversationLock: PluginAdapter {
    /// Take the lease if it is free or expired at `now`. Returns whether it was taken.
    async fn try_lock(
        &self,
        conversation_id: &str,
        owner: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, CadenceError>;

    /// Release the lease if `owner` still holds it.
    async fn unlock(&self, conversation_id: &str, owner: &str) -> Result<(), CadenceError>;
}
