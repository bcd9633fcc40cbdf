// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation lease shared by the debounce flush and follow-up dispatch.
//!
//! Both halves of the scheduler take the same lease before calling the
//! responder, so a conversation never has two sends in flight. Acquisition
//! is non-blocking: a held lease means "skip this cycle".

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::CadenceError;
use crate::traits::ConversationLock;

/// Hands out expiring per-conversation leases on top of a [`ConversationLock`].
#[derive(Clone)]
pub struct ConversationLease {
    locks: Arc<dyn ConversationLock>,
    clock: Arc<dyn Clock>,
    instance_id: String,
    ttl: Duration,
}

impl ConversationLease {
    /// `ttl` must outlive the slowest dispatch, or a second holder could
    /// take over an expired lease mid-send.
    pub fn new(
        locks: Arc<dyn ConversationLock>,
        clock: Arc<dyn Clock>,
        instance_id: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            locks,
            clock,
            instance_id: instance_id.into(),
            ttl,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Try to take the lease. `Ok(None)` means someone else holds it.
    pub async fn try_acquire(
        &self,
        conversation_id: &str,
    ) -> Result<Option<LeaseGuard>, CadenceError> {
        let owner = format!("{}:{}", self.instance_id, uuid::Uuid::new_v4());
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| CadenceError::Internal(format!("lease ttl out of range: {e}")))?;

        if self
            .locks
            .try_lock(conversation_id, &owner, now + ttl, now)
            .await?
        {
            Ok(Some(LeaseGuard {
                locks: self.locks.clone(),
                conversation_id: conversation_id.to_string(),
                owner,
            }))
        } else {
            debug!(conversation_id, "lease held elsewhere");
            Ok(None)
        }
    }
}

/// A held lease. Release it explicitly; an unreleased lease expires on its own.
#[must_use = "a lease that is never released stays held until it expires"]
pub struct LeaseGuard {
    locks: Arc<dyn ConversationLock>,
    conversation_id: String,
    owner: String,
}

impl LeaseGuard {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Release the lease. Failures are logged; the lease then lapses at its expiry.
    pub async fn release(self) {
        if let Err(e) = self.locks.unlock(&self.conversation_id, &self.owner).await {
            warn!(
                conversation_id = %self.conversation_id,
                error = %e,
                "failed to release conversation lease"
            );
        }
    }
}
