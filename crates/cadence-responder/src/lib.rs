// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook implementation of the Cadence [`Responder`] trait.
//!
//! Replies and follow-ups are POSTed as JSON to one configured endpoint,
//! which owns message generation and delivery to the channel.

pub mod client;
pub mod types;

use async_trait::async_trait;

use cadence_config::model::ResponderConfig;
use cadence_core::types::{AdapterType, Conversation, FollowUpContent, HealthStatus};
use cadence_core::{CadenceError, PluginAdapter, Responder};

use crate::client::WebhookClient;
use crate::types::{ConversationRef, WebhookPayload};

pub struct WebhookResponder {
    client: WebhookClient,
}

impl WebhookResponder {
    /// Build from config. Fails when no endpoint is configured.
    pub fn new(config: &ResponderConfig) -> Result<Self, CadenceError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            CadenceError::Config("responder.endpoint must be set to dispatch messages".into())
        })?;
        let client = WebhookClient::new(endpoint, config.auth_token.clone(), config.timeout_secs)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PluginAdapter for WebhookResponder {
    fn name(&self) -> &str {
        "webhook"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Responder
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[async_trait]
impl Responder for WebhookResponder {
    async fn respond(
        &self,
        conversation: &Conversation,
        text: &str,
        lead_name: &str,
    ) -> Result<(), CadenceError> {
        self.client
            .post(&WebhookPayload::Reply {
                conversation: ConversationRef::from(conversation),
                lead_name,
                text,
            })
            .await
    }

    async fn send_follow_up(
        &self,
        conversation: &Conversation,
        content: &FollowUpContent,
        lead_name: &str,
    ) -> Result<(), CadenceError> {
        self.client
            .post(&WebhookPayload::FollowUp {
                conversation: ConversationRef::from(conversation),
                lead_name,
                content,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_is_a_config_error() {
        let config = ResponderConfig {
            endpoint: None,
            auth_token: None,
            timeout_secs: 30,
        };
        assert!(matches!(
            WebhookResponder::new(&config),
            Err(CadenceError::Config(_))
        ));
    }
}
