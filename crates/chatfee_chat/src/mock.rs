//! Mock delivery client for testing.
//!
//! Provides a scripted implementation of [`DeliveryClient`] that records
//! every call, so tests can verify delivery behavior without a server.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Semaphore;

use crate::delivery::DeliveryClient;
use crate::error::{ChatError, ChatResult};

/// Predefined outcome for one delivery call.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub outcome: Result<String, String>,
    pub delay: Duration,
}

impl MockResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Mock delivery client.
///
/// Responses are consumed in call order; once the script runs out the
/// client echoes the message back as `You said: <text>`. When held, calls
/// are recorded immediately but do not complete until released, which lets
/// tests observe a delivery in flight.
#[derive(Clone)]
pub struct MockDelivery {
    responses: Arc<RwLock<VecDeque<MockResponse>>>,
    calls: Arc<RwLock<Vec<String>>>,
    gate: Arc<RwLock<Option<Arc<Semaphore>>>>,
}

impl Default for MockDelivery {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDelivery {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(VecDeque::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            gate: Arc::new(RwLock::new(None)),
        }
    }

    /// Queue a response for the next unanswered call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push_back(response);
        self
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.add_response(MockResponse::reply(text))
    }

    /// Queue a failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.add_response(MockResponse::failure(message))
    }

    /// Hold subsequent calls until [`MockDelivery::release`] is called.
    pub fn hold(&self) {
        *self.gate.write() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held calls complete, in the order they arrived.
    pub fn release(&self, count: usize) {
        if let Some(gate) = self.gate.read().as_ref() {
            gate.add_permits(count);
        }
    }

    /// Messages received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }
}

#[async_trait]
impl DeliveryClient for MockDelivery {
    async fn deliver(&self, message: &str) -> ChatResult<String> {
        self.calls.write().push(message.to_string());
        let response = self.responses.write().pop_front();

        let gate = self.gate.read().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| ChatError::Delivery("mock gate closed".to_string()))?;
            permit.forget();
        }

        let response =
            response.unwrap_or_else(|| MockResponse::reply(format!("You said: {}", message)));
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }

        response.outcome.map_err(ChatError::Delivery)
    }
}
