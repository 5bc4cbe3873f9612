//! Delivery controller.
//!
//! Drives one outgoing message through its life cycle:
//!
//! ```text
//! validate ─▶ append user message ─▶ deliver ─┬─▶ append reply ──────┐
//!                                             └─▶ append error text ─┴─▶ clear indicator
//! ```
//!
//! The user message is appended before the delivery call and is never rolled
//! back. Each invocation is independent: several may be in flight for the
//! same session, and replies land in the order they arrive.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bridge::InteractionBridge;
use crate::delivery::DeliveryClient;
use crate::error::{ChatError, ChatResult};
use crate::synced::SyncedSessions;
use crate::types::{Message, SessionId, DELIVERY_FAILURE_TEXT, EMPTY_REPLY_TEXT};

/// Reply state of a session as shown to the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryState {
    Idle,
    AwaitingReply,
}

/// How a delivery ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The backend replied and the reply was appended
    Replied(Message),
    /// The backend failed and the fixed error message was appended
    Failed(Message),
    /// The session disappeared while the reply was pending
    Dropped,
}

impl DeliveryOutcome {
    /// The appended assistant message, if any
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Replied(m) | Self::Failed(m) => Some(m),
            Self::Dropped => None,
        }
    }
}

/// Per-session count of deliveries awaiting a reply
#[derive(Debug, Clone, Default)]
pub struct PendingReplies {
    counts: Arc<Mutex<HashMap<SessionId, usize>>>,
}

impl PendingReplies {
    fn begin(&self, session_id: &str) -> PendingGuard {
        *self.counts.lock().entry(session_id.to_string()).or_insert(0) += 1;
        PendingGuard {
            pending: self.clone(),
            session_id: session_id.to_string(),
        }
    }

    fn finish(&self, session_id: &str) {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(session_id) {
            *count -= 1;
            if *count == 0 {
                counts.remove(session_id);
            }
        }
    }

    pub fn is_awaiting(&self, session_id: &str) -> bool {
        self.counts.lock().contains_key(session_id)
    }

    pub fn state(&self, session_id: &str) -> DeliveryState {
        if self.is_awaiting(session_id) {
            DeliveryState::AwaitingReply
        } else {
            DeliveryState::Idle
        }
    }

    /// Deliveries in flight across all sessions
    pub fn in_flight(&self) -> usize {
        self.counts.lock().values().sum()
    }
}

/// Clears one awaiting-reply mark when dropped, whatever the exit path
struct PendingGuard {
    pending: PendingReplies,
    session_id: SessionId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.finish(&self.session_id);
    }
}

/// Sends user messages and records the replies
#[derive(Clone)]
pub struct DeliveryController {
    sessions: SyncedSessions,
    client: Arc<dyn DeliveryClient>,
    bridge: InteractionBridge,
    pending: PendingReplies,
}

impl DeliveryController {
    pub fn new(
        sessions: SyncedSessions,
        client: Arc<dyn DeliveryClient>,
        bridge: InteractionBridge,
    ) -> Self {
        Self {
            sessions,
            client,
            bridge,
            pending: PendingReplies::default(),
        }
    }

    pub fn pending(&self) -> &PendingReplies {
        &self.pending
    }

    /// Send a message and wait for the reply to be recorded.
    ///
    /// Returns `EmptyMessage` for blank input and `SessionNotFound` for an
    /// unknown session; in both cases nothing is appended and the backend is
    /// not called. Backend failures are not errors here: they end as
    /// [`DeliveryOutcome::Failed`].
    pub async fn send(&self, session_id: &str, text: &str) -> ChatResult<DeliveryOutcome> {
        let (message, guard) = self.prepare(session_id, text)?;
        Ok(self.complete(session_id.to_string(), message, guard).await)
    }

    /// Append the user message now and finish the delivery on a background
    /// task. Must be called from within a tokio runtime.
    pub fn spawn_send(&self, session_id: &str, text: &str) -> ChatResult<JoinHandle<DeliveryOutcome>> {
        let (message, guard) = self.prepare(session_id, text)?;
        let controller = self.clone();
        let session_id = session_id.to_string();
        Ok(tokio::spawn(async move {
            controller.complete(session_id, message, guard).await
        }))
    }

    fn prepare(&self, session_id: &str, text: &str) -> ChatResult<(String, PendingGuard)> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.sessions
            .mutate(|repo| repo.append_message(session_id, Message::user(text)))?;
        debug!(session_id, "awaiting reply");

        Ok((text.to_string(), self.pending.begin(session_id)))
    }

    async fn complete(&self, session_id: SessionId, text: String, guard: PendingGuard) -> DeliveryOutcome {
        // The call itself sits inside the future so a client that panics
        // before its first await is caught too.
        let result = AssertUnwindSafe(async { self.client.deliver(&text).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ChatError::Delivery("delivery client panicked".to_string())));

        let (reply, delivered) = match result {
            Ok(reply) if reply.trim().is_empty() => (EMPTY_REPLY_TEXT.to_string(), true),
            Ok(reply) => (reply, true),
            Err(e) => {
                warn!(session_id = %session_id, "Delivery failed: {}", e);
                (DELIVERY_FAILURE_TEXT.to_string(), false)
            }
        };

        let appended = self
            .sessions
            .mutate(|repo| repo.append_message(&session_id, Message::assistant(reply)));
        drop(guard);

        match appended {
            Ok(message) if delivered => {
                // Listeners finish on their own; the delivery does not wait.
                let _ = self.bridge.notify_reply_ready(&message.content);
                DeliveryOutcome::Replied(message)
            }
            Ok(message) => DeliveryOutcome::Failed(message),
            Err(e) => {
                debug!(session_id = %session_id, "Dropping reply: {}", e);
                DeliveryOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ReplyListener;
    use crate::delivery::MockDeliveryClient;
    use crate::persistence::PersistentStore;
    use crate::repository::SessionRepository;
    use crate::types::MessageRole;
    use std::time::{Duration, Instant};

    struct Recorder(Mutex<Vec<String>>);

    impl ReplyListener for Recorder {
        fn on_reply(&self, text: &str) -> ChatResult<()> {
            self.0.lock().push(text.to_string());
            Ok(())
        }
    }

    fn setup(client: MockDeliveryClient) -> (DeliveryController, SyncedSessions, SessionId) {
        let sessions = SyncedSessions::new(SessionRepository::new(), PersistentStore::in_memory());
        let session = sessions.apply(|repo| repo.create_session());
        let controller =
            DeliveryController::new(sessions.clone(), Arc::new(client), InteractionBridge::new());
        (controller, sessions, session.id)
    }

    fn transcript(sessions: &SyncedSessions, id: &str) -> Vec<(MessageRole, String)> {
        sessions.read(|repo| {
            repo.get(id)
                .map(|s| s.messages.iter().map(|m| (m.role, m.content.clone())).collect())
                .unwrap_or_default()
        })
    }

    #[tokio::test]
    async fn test_reply_is_appended() {
        let mut client = MockDeliveryClient::new();
        client
            .expect_deliver()
            .withf(|msg| msg == "hello")
            .times(1)
            .returning(|_| Ok("world".to_string()));
        let (controller, sessions, id) = setup(client);

        let outcome = controller.send(&id, "hello").await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Replied(_)));
        assert_eq!(
            transcript(&sessions, &id),
            vec![
                (MessageRole::User, "hello".to_string()),
                (MessageRole::Assistant, "world".to_string()),
            ]
        );
        assert_eq!(controller.pending().state(&id), DeliveryState::Idle);
    }

    #[tokio::test]
    async fn test_failure_appends_fixed_text() {
        let mut client = MockDeliveryClient::new();
        client
            .expect_deliver()
            .returning(|_| Err(ChatError::Delivery("connection refused".to_string())));
        let (controller, sessions, id) = setup(client);

        let outcome = controller.send(&id, "hello").await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
        assert_eq!(
            transcript(&sessions, &id),
            vec![
                (MessageRole::User, "hello".to_string()),
                (MessageRole::Assistant, DELIVERY_FAILURE_TEXT.to_string()),
            ]
        );
        assert!(!controller.pending().is_awaiting(&id));
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let mut client = MockDeliveryClient::new();
        client.expect_deliver().times(0);
        let (controller, sessions, id) = setup(client);

        let err = controller.send(&id, "   ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert!(transcript(&sessions, &id).is_empty());
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let mut client = MockDeliveryClient::new();
        client
            .expect_deliver()
            .withf(|msg| msg == "padded")
            .returning(|_| Ok("ok".to_string()));
        let (controller, sessions, id) = setup(client);

        controller.send(&id, "  padded\n").await.unwrap();
        assert_eq!(transcript(&sessions, &id)[0].1, "padded");
    }

    #[tokio::test]
    async fn test_unknown_session_skips_delivery() {
        let mut client = MockDeliveryClient::new();
        client.expect_deliver().times(0);
        let (controller, _sessions, _id) = setup(client);

        let err = controller.send("missing", "hello").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(controller.pending().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_empty_reply_gets_placeholder() {
        let mut client = MockDeliveryClient::new();
        client.expect_deliver().returning(|_| Ok(String::new()));
        let (controller, sessions, id) = setup(client);

        controller.send(&id, "hello").await.unwrap();
        assert_eq!(transcript(&sessions, &id)[1].1, EMPTY_REPLY_TEXT);
    }

    #[tokio::test]
    async fn test_session_deleted_in_flight() {
        let sessions = SyncedSessions::new(SessionRepository::new(), PersistentStore::in_memory());
        let session = sessions.apply(|repo| repo.create_session());

        let mut client = MockDeliveryClient::new();
        let deleter = sessions.clone();
        let target = session.id.clone();
        client.expect_deliver().returning(move |_| {
            deleter.mutate(|repo| repo.delete_session(&target)).unwrap();
            Ok("too late".to_string())
        });
        let controller =
            DeliveryController::new(sessions.clone(), Arc::new(client), InteractionBridge::new());

        let outcome = controller.send(&session.id, "hello").await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Dropped);
        assert!(sessions.read(|repo| repo.is_empty()));
        assert!(!controller.pending().is_awaiting(&session.id));
    }

    #[tokio::test]
    async fn test_listener_sees_replies_only() {
        let mut client = MockDeliveryClient::new();
        let mut calls = 0;
        client.expect_deliver().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok("first".to_string())
            } else {
                Err(ChatError::Delivery("down".to_string()))
            }
        });
        let sessions = SyncedSessions::new(SessionRepository::new(), PersistentStore::in_memory());
        let session = sessions.apply(|repo| repo.create_session());
        let bridge = InteractionBridge::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        bridge.add_reply_listener(recorder.clone());
        let controller = DeliveryController::new(sessions, Arc::new(client), bridge);

        controller.send(&session.id, "one").await.unwrap();
        controller.send(&session.id, "two").await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while recorder.0.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(*recorder.0.lock(), vec!["first".to_string()]);
    }

    struct PanickingClient;

    #[async_trait::async_trait]
    impl DeliveryClient for PanickingClient {
        async fn deliver(&self, _message: &str) -> ChatResult<String> {
            panic!("backend exploded");
        }
    }

    #[tokio::test]
    async fn test_panicking_client_appends_fixed_text() {
        let sessions = SyncedSessions::new(SessionRepository::new(), PersistentStore::in_memory());
        let session = sessions.apply(|repo| repo.create_session());
        let controller =
            DeliveryController::new(sessions.clone(), Arc::new(PanickingClient), InteractionBridge::new());

        let outcome = controller.send(&session.id, "hello").await.unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
        assert_eq!(
            transcript(&sessions, &session.id).last().unwrap().1,
            DELIVERY_FAILURE_TEXT
        );
        assert_eq!(controller.pending().state(&session.id), DeliveryState::Idle);
    }

    struct SlowListener;

    impl ReplyListener for SlowListener {
        fn on_reply(&self, _text: &str) -> ChatResult<()> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_slow_listener_does_not_hold_up_replies() {
        let mut client = MockDeliveryClient::new();
        client.expect_deliver().returning(|_| Ok("quick".to_string()));
        let sessions = SyncedSessions::new(SessionRepository::new(), PersistentStore::in_memory());
        let a = sessions.apply(|repo| repo.create_session());
        let b = sessions.apply(|repo| repo.create_session());
        let bridge = InteractionBridge::new();
        bridge.add_reply_listener(Arc::new(SlowListener));
        let controller = DeliveryController::new(sessions.clone(), Arc::new(client), bridge);

        let started = Instant::now();
        let first = controller.spawn_send(&a.id, "to a").unwrap();
        let second = controller.spawn_send(&b.id, "to b").unwrap();
        first.await.unwrap();
        second.await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(transcript(&sessions, &b.id)[1].1, "quick");
        assert_eq!(controller.pending().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_spawned_send_appends_user_first() {
        let mut client = MockDeliveryClient::new();
        client.expect_deliver().returning(|_| Ok("later".to_string()));
        let (controller, sessions, id) = setup(client);

        let handle = controller.spawn_send(&id, "now").unwrap();
        assert_eq!(transcript(&sessions, &id), vec![(MessageRole::User, "now".to_string())]);

        let outcome = handle.await.unwrap();
        assert_eq!(outcome.message().unwrap().content, "later");
        assert_eq!(transcript(&sessions, &id).len(), 2);
        assert_eq!(controller.pending().in_flight(), 0);
    }
}
