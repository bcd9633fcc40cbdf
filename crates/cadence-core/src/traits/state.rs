// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared conversation state store used by the debounce aggregator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{PendingBuffer, PendingResponse};

/// Transient per-conversation state: fragment buffers, silence timers,
/// pending-response metadata, and the active-debounce set.
///
/// Every method is atomic with respect to the others for a single
/// conversation id. Implementations shared by several scheduler instances
/// must provide that atomicity across processes.
#[async_trait]
pub trait StateStore: PluginAdapter {
    /// Append `text` to the buffer, overwrite the metadata, set the silence
    /// timer to `at`, and add the id to the active set.
    ///
    /// The id is added to the active set on every call, even if it is
    /// already present.
    async fn append_fragment(
        &self,
        pending: &PendingResponse,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CadenceError>;

    /// Ids currently in the active-debounce set.
    async fn active_conversations(&self) -> Result<Vec<String>, CadenceError>;

    /// The silence timer for a conversation, if one is set.
    async fn last_activity(
        &self,
        conversation_id: &str,
    ) -> Result<Option<DateTime<Utc>>, CadenceError>;

    /// Remove an id from the active set. Returns whether it was present.
    async fn remove_active(&self, conversation_id: &str) -> Result<bool, CadenceError>;

    /// Read and delete the buffer, metadata, and timer in one step.
    async fn take_pending(&self, conversation_id: &str) -> Result<PendingBuffer, CadenceError>;

    /// Delete every trace of a conversation, active-set membership included.
    async fn clear(&self, conversation_id: &str) -> Result<(), CadenceError>;
}
