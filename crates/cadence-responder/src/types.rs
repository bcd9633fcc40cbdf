// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook request bodies.

use serde::Serialize;

use cadence_core::types::{Conversation, FollowUpContent, SupportMode};

/// The conversation fields a receiver needs to route a message.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRef<'a> {
    pub id: &'a str,
    pub company_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
    pub support_mode: SupportMode,
}

impl<'a> From<&'a Conversation> for ConversationRef<'a> {
    fn from(c: &'a Conversation) -> Self {
        Self {
            id: &c.id,
            company_id: &c.company_id,
            phone_number: c.phone_number.as_deref(),
            support_mode: c.support_mode,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebhookPayload<'a> {
    /// Answer to a merged burst of inbound fragments.
    Reply {
        conversation: ConversationRef<'a>,
        lead_name: &'a str,
        text: &'a str,
    },
    /// One proactive follow-up step.
    FollowUp {
        conversation: ConversationRef<'a>,
        lead_name: &'a str,
        content: &'a FollowUpContent,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn follow_up_payload_shape() {
        let conversation = Conversation {
            id: "conv-1".into(),
            company_id: "co-1".into(),
            contact_name: Some("Ana".into()),
            phone_number: None,
            support_mode: SupportMode::Ai,
        };
        let content = FollowUpContent::Generate {
            prompt: "retome".into(),
        };
        let payload = WebhookPayload::FollowUp {
            conversation: ConversationRef::from(&conversation),
            lead_name: "Ana",
            content: &content,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "kind": "follow_up",
                "conversation": {"id": "conv-1", "company_id": "co-1", "support_mode": "ai"},
                "lead_name": "Ana",
                "content": {"type": "generate", "prompt": "retome"}
            })
        );
    }
}
