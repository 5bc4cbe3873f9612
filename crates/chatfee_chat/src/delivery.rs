//! Delivery clients: "send text, get text or fail".
//!
//! The controller only sees [`DeliveryClient`]. The default transport is the
//! chat endpoint of the companion server (`POST /api/chat`); the completion
//! adapter in [`crate::llm`] talks to an OpenRouter-compatible API directly.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

/// External request/response operation used to obtain assistant replies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Send one user message and return the assistant's reply text
    async fn deliver(&self, message: &str) -> ChatResult<String>;
}

/// Bounded retry with exponential backoff for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay to wait before `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base_delay.saturating_mul(1 << (attempt - 1).min(16))
    }

    /// Send a request, retrying on network errors, 5xx and 429.
    ///
    /// Other non-success statuses fail immediately. `label` names the
    /// backend in error messages.
    pub(crate) async fn send<F>(&self, label: &str, build: F) -> ChatResult<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.delay_for(attempt)).await;
            }

            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) => {
                    debug!(attempt, "{} request failed: {}", label, e);
                    last_error = Some(ChatError::Delivery(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(ChatError::Delivery(format!(
                    "{} error {} (attempt {}/{}): {}",
                    label,
                    status,
                    attempt + 1,
                    attempts,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ChatError::Delivery(format!("{} error {}: {}", label, status, body)));
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| ChatError::Delivery("Max retries exceeded".to_string())))
    }
}

/// Request body of the chat endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response body of the chat endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Client for the companion server's `POST /api/chat`
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    endpoint: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpDelivery {
    /// `endpoint` is the server base URL, e.g. `http://localhost:3000`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint)
    }
}

#[async_trait]
impl DeliveryClient for HttpDelivery {
    async fn deliver(&self, message: &str) -> ChatResult<String> {
        let url = self.chat_url();
        let request = ChatRequest {
            message: message.to_string(),
        };

        let response = self
            .retry
            .send("Chat server", || self.client.post(&url).json(&request))
            .await?;

        let body: ChatReply = response
            .json()
            .await
            .map_err(|e| ChatError::Delivery(format!("Failed to parse response: {}", e)))?;

        Ok(body.reply)
    }
}
