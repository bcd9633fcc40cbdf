// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound responder trait.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, FollowUpContent};

/// Produces and sends outbound messages.
///
/// The scheduler calls each method at most once per dispatch decision.
/// Implementations own their send timeout.
#[async_trait]
pub trait Responder: PluginAdapter {
    /// Answer a merged burst of inbound fragments.
    async fn respond(
        &self,
        conversation: &Conversation,
        text: &str,
        lead_name: &str,
    ) -> Result<(), CadenceError>;

    /// Send one follow-up step.
    async fn send_follow_up(
        &self,
        conversation: &Conversation,
        content: &FollowUpContent,
        lead_name: &str,
    ) -> Result<(), CadenceError>;
}
