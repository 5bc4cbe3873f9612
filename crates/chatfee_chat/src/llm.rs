//! Direct chat-completion delivery.
//!
//! Talks to an OpenRouter-compatible `/chat/completions` API without going
//! through the companion server. Each message is sent on its own, with no
//! conversation history, exactly like the server route does.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryClient, RetryPolicy};
use crate::error::{ChatError, ChatResult};

/// Default API base URL
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default completion model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Reply used when the API answers without any choice content
pub const NO_REPLY_TEXT: &str = "No reply";

/// Completion adapter that handles API calls
#[derive(Debug, Clone)]
pub struct CompletionDelivery {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl CompletionDelivery {
    /// Create a new adapter with explicit configuration
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: OPENROUTER_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create an adapter from `OPENROUTER_API_KEY` (and optional
    /// `CHATFEE_MODEL`)
    pub fn from_env() -> ChatResult<Self> {
        let custom_model = std::env::var("CHATFEE_MODEL").ok().filter(|m| !m.is_empty());

        match std::env::var("OPENROUTER_API_KEY") {
            Ok(api_key) if !api_key.is_empty() => Ok(Self::new(api_key, custom_model)),
            _ => Err(ChatError::ProviderNotConfigured(
                "Set OPENROUTER_API_KEY".to_string(),
            )),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DeliveryClient for CompletionDelivery {
    async fn deliver(&self, message: &str) -> ChatResult<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![CompletionMessage {
                role: "user".to_string(),
                content: message.to_string(),
            }],
        };

        let response = self
            .retry
            .send("Completion API", || {
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
            })
            .await?;

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Delivery(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NO_REPLY_TEXT.to_string());

        Ok(content)
    }
}

// Completion API types
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
}

#[derive(Debug, Serialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionResponseMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionResponseMessage {
    content: Option<String>,
}
