// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the responder webhook.
//!
//! Sends are never retried here: a failed reply is dropped and a failed
//! follow-up is retried by the scheduler on its next poll.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use tracing::debug;

use cadence_core::CadenceError;

#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl WebhookClient {
    pub fn new(
        endpoint: String,
        auth_token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, CadenceError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert(
            "user-agent",
            HeaderValue::from_static(concat!("cadence/", env!("CARGO_PKG_VERSION"))),
        );

        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CadenceError::Responder {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint,
            auth_token,
            timeout,
        })
    }

    /// POST `body` as JSON. Any non-2xx status is an error.
    pub async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), CadenceError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CadenceError::Timeout {
                    duration: self.timeout,
                }
            } else {
                CadenceError::Responder {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        debug!(status = %status, endpoint = %self.endpoint, "webhook response received");
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(CadenceError::Responder {
            message: format!("webhook returned {status}: {body}"),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_json_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("authorization", "Bearer s3cret"))
            .and(body_json(json!({"hello": "world"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            WebhookClient::new(format!("{}/hook", server.uri()), Some("s3cret".into()), 5).unwrap();
        client.post(&json!({"hello": "world"})).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_a_responder_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebhookClient::new(server.uri(), None, 5).unwrap();
        let err = client.post(&json!({})).await.unwrap_err();
        match err {
            CadenceError::Responder { message, .. } => {
                assert!(message.contains("503"), "{message}");
                assert!(message.contains("busy"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = WebhookClient::new(server.uri(), None, 1).unwrap();
        let err = client.post(&json!({})).await.unwrap_err();
        assert!(matches!(err, CadenceError::Timeout { .. }), "{err}");
    }
}
