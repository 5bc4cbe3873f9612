//! Chat session manager.
//!
//! This module provides the main entry point for chat operations,
//! coordinating between the repository, persistence, delivery and the
//! interaction bridge.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bridge::InteractionBridge;
use crate::config::ChatConfig;
use crate::controller::{DeliveryController, DeliveryOutcome, DeliveryState};
use crate::delivery::DeliveryClient;
use crate::error::{ChatError, ChatResult};
use crate::persistence::PersistentStore;
use crate::synced::SyncedSessions;
use crate::types::{DisplayMode, Session, SessionSummary};

/// Main chat session manager
pub struct ChatManager {
    sessions: SyncedSessions,
    controller: DeliveryController,
    bridge: InteractionBridge,
    display_mode: RwLock<DisplayMode>,
}

impl ChatManager {
    /// Load persisted state from `store` and deliver through `client`
    pub fn new(store: PersistentStore, client: Arc<dyn DeliveryClient>) -> Self {
        let display_mode = store.load_display_mode();
        let sessions = SyncedSessions::load(store);
        let bridge = InteractionBridge::new();
        let controller = DeliveryController::new(sessions.clone(), client, bridge.clone());

        info!(
            sessions = sessions.read(|repo| repo.len()),
            "Loaded chat sessions"
        );

        Self {
            sessions,
            controller,
            bridge,
            display_mode: RwLock::new(display_mode),
        }
    }

    /// Create a manager from client settings
    pub fn from_config(config: &ChatConfig) -> ChatResult<Self> {
        let store = PersistentStore::open(config.data_dir());
        let client = config.build_delivery()?;
        Ok(Self::new(store, client))
    }

    pub fn bridge(&self) -> &InteractionBridge {
        &self.bridge
    }

    pub fn controller(&self) -> &DeliveryController {
        &self.controller
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All sessions, most recent first
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.read(|repo| repo.sessions().to_vec())
    }

    /// List sessions with their selection and reply state
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let pending = self.controller.pending();
        self.sessions.read(|repo| {
            repo.sessions()
                .iter()
                .map(|s| SessionSummary {
                    id: s.id.clone(),
                    title: s.title.clone(),
                    message_count: s.messages.len(),
                    active: repo.active_id() == Some(s.id.as_str()),
                    awaiting_reply: pending.is_awaiting(&s.id),
                })
                .collect()
        })
    }

    pub fn get_session(&self, session_id: &str) -> ChatResult<Session> {
        self.sessions
            .read(|repo| repo.get(session_id).cloned())
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    pub fn active_session(&self) -> Option<Session> {
        self.sessions.read(|repo| repo.active().cloned())
    }

    pub fn delivery_state(&self, session_id: &str) -> DeliveryState {
        self.controller.pending().state(session_id)
    }

    // =========================================================================
    // Session structure
    // =========================================================================

    /// Start a new chat and select it
    pub fn new_session(&self) -> Session {
        let session = self.sessions.apply(|repo| repo.create_session());
        info!(session_id = %session.id, "Started new chat");
        session
    }

    pub fn select_session(&self, session_id: &str) -> ChatResult<()> {
        self.sessions.select(session_id)
    }

    pub fn rename_session(&self, session_id: &str, title: &str) -> ChatResult<()> {
        self.sessions
            .mutate(|repo| repo.rename_session(session_id, title.trim()))
    }

    pub fn delete_session(&self, session_id: &str) -> ChatResult<()> {
        self.sessions.mutate(|repo| repo.delete_session(session_id))?;
        info!(session_id, "Deleted chat");
        Ok(())
    }

    /// Remove every session. Callers confirm with the user first.
    pub fn clear_all(&self) -> usize {
        let removed = self.sessions.apply(|repo| repo.clear_all());
        info!(removed, "Cleared all chats");
        removed
    }

    pub fn react(&self, session_id: &str, message_id: &str, reaction: &str) -> ChatResult<()> {
        let reaction = reaction.trim();
        if reaction.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.sessions
            .mutate(|repo| repo.set_reaction(session_id, message_id, reaction))
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Send a message to a session and wait for the reply to be recorded
    pub async fn send_message(&self, session_id: &str, text: &str) -> ChatResult<DeliveryOutcome> {
        self.controller.send(session_id, text).await
    }

    /// Append the message now and resolve the reply in the background
    pub fn spawn_message(&self, session_id: &str, text: &str) -> ChatResult<JoinHandle<DeliveryOutcome>> {
        self.controller.spawn_send(session_id, text)
    }

    /// Send the input buffer to the active session.
    ///
    /// The buffer is only consumed when there is an active session and it
    /// holds something other than whitespace.
    pub async fn submit_input(&self) -> ChatResult<DeliveryOutcome> {
        let session_id = self
            .sessions
            .read(|repo| repo.active_id().map(str::to_string))
            .ok_or(ChatError::NoActiveSession)?;

        if self.bridge.input().trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let text = self.bridge.take_input();
        self.controller.send(&session_id, &text).await
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub fn display_mode(&self) -> DisplayMode {
        *self.display_mode.read()
    }

    pub fn set_display_mode(&self, mode: DisplayMode) {
        *self.display_mode.write() = mode;
        if let Err(e) = self.sessions.store().save_display_mode(mode) {
            warn!("Failed to persist display mode: {}", e);
        }
    }

    pub fn toggle_display_mode(&self) -> DisplayMode {
        let mode = self.display_mode().toggled();
        self.set_display_mode(mode);
        mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDelivery;
    use crate::types::{MessageRole, DELIVERY_FAILURE_TEXT};

    fn manager_with(store: PersistentStore, delivery: MockDelivery) -> ChatManager {
        ChatManager::new(store, Arc::new(delivery))
    }

    #[tokio::test]
    async fn test_send_to_new_session() {
        let manager = manager_with(PersistentStore::in_memory(), MockDelivery::new().reply("world"));
        let session = manager.new_session();

        manager.send_message(&session.id, "hello").await.unwrap();

        let stored = manager.get_session(&session.id).unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[0].role, MessageRole::User);
        assert_eq!(stored.messages[1].content, "world");
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let store = PersistentStore::in_memory();
        let session_id = {
            let manager = manager_with(store.clone(), MockDelivery::new().fail("offline"));
            let session = manager.new_session();
            manager.rename_session(&session.id, " Groceries ").unwrap();
            manager.send_message(&session.id, "milk?").await.unwrap();
            manager.set_display_mode(DisplayMode::Dark);
            session.id
        };

        let manager = manager_with(store, MockDelivery::new());
        let restored = manager.get_session(&session_id).unwrap();
        assert_eq!(restored.title, "Groceries");
        assert!(!restored.title_editing);
        assert_eq!(restored.messages[1].content, DELIVERY_FAILURE_TEXT);
        assert_eq!(manager.display_mode(), DisplayMode::Dark);
        assert!(manager.active_session().is_none());
    }

    #[tokio::test]
    async fn test_submit_input_requires_active_session() {
        let delivery = MockDelivery::new();
        let manager = manager_with(PersistentStore::in_memory(), delivery.clone());
        manager.bridge().set_input("hi");

        assert!(matches!(
            manager.submit_input().await.unwrap_err(),
            ChatError::NoActiveSession
        ));
        assert_eq!(manager.bridge().input(), "hi");

        let session = manager.new_session();
        manager.bridge().submit_captured_text("there");
        let outcome = manager.submit_input().await.unwrap();

        assert_eq!(outcome.message().unwrap().content, "You said: hi there");
        assert_eq!(manager.bridge().input(), "");
        assert_eq!(manager.get_session(&session.id).unwrap().messages[0].content, "hi there");
        assert_eq!(delivery.calls(), vec!["hi there"]);
    }

    #[tokio::test]
    async fn test_blank_buffer_is_kept() {
        let manager = manager_with(PersistentStore::in_memory(), MockDelivery::new());
        manager.new_session();
        manager.bridge().set_input("   ");

        assert!(matches!(
            manager.submit_input().await.unwrap_err(),
            ChatError::EmptyMessage
        ));
        assert_eq!(manager.bridge().input(), "   ");
    }

    #[test]
    fn test_list_marks_active() {
        let manager = manager_with(PersistentStore::in_memory(), MockDelivery::new());
        let older = manager.new_session();
        let newer = manager.new_session();

        let listed = manager.list_sessions();
        assert_eq!(listed[0].id, newer.id);
        assert!(listed[0].active);
        assert!(!listed[1].active);

        manager.select_session(&older.id).unwrap();
        assert!(manager.list_sessions()[1].active);
    }

    #[test]
    fn test_clear_all_then_reload() {
        let store = PersistentStore::in_memory();
        let manager = manager_with(store.clone(), MockDelivery::new());
        manager.new_session();
        manager.new_session();
        assert_eq!(manager.clear_all(), 2);

        let reloaded = manager_with(store, MockDelivery::new());
        assert!(reloaded.sessions().is_empty());
    }

    #[test]
    fn test_toggle_display_mode() {
        let store = PersistentStore::in_memory();
        let manager = manager_with(store.clone(), MockDelivery::new());
        assert_eq!(manager.toggle_display_mode(), DisplayMode::Dark);
        assert_eq!(store.load_display_mode(), DisplayMode::Dark);
        assert_eq!(manager.toggle_display_mode(), DisplayMode::Light);
    }

    #[test]
    fn test_blank_reaction_rejected() {
        let manager = manager_with(PersistentStore::in_memory(), MockDelivery::new());
        let session = manager.new_session();
        assert!(manager.react(&session.id, "m", "  ").is_err());
    }
}
