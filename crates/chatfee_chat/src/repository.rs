//! In-memory session repository.
//!
//! Holds the ordered session collection (most recent first) and the active
//! selection. It is the single source of truth for what the persistent store
//! mirrors; nothing here touches disk.

use tracing::debug;

use crate::error::{ChatError, ChatResult};
use crate::types::{Message, Session, SessionId};

/// Ordered collection of chat sessions
#[derive(Debug, Clone, Default)]
pub struct SessionRepository {
    sessions: Vec<Session>,
    active: Option<SessionId>,
}

impl SessionRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a repository from persisted sessions. Nothing is selected.
    pub fn from_sessions(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            active: None,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    fn get_mut(&mut self, session_id: &str) -> ChatResult<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    /// Create a session at the front of the list and select it
    pub fn create_session(&mut self) -> Session {
        let session = Session::new();
        debug!(session_id = %session.id, "created session");
        self.sessions.insert(0, session.clone());
        self.active = Some(session.id.clone());
        session
    }

    /// Make an existing session the active one
    pub fn select_session(&mut self, session_id: &str) -> ChatResult<()> {
        if self.get(session_id).is_none() {
            return Err(ChatError::SessionNotFound(session_id.to_string()));
        }
        self.active = Some(session_id.to_string());
        Ok(())
    }

    /// Set the title and leave the editing state
    pub fn rename_session(&mut self, session_id: &str, title: impl Into<String>) -> ChatResult<()> {
        let session = self.get_mut(session_id)?;
        session.title = title.into();
        session.title_editing = false;
        Ok(())
    }

    /// Remove a session and its messages. Deleting the active session leaves
    /// nothing selected.
    pub fn delete_session(&mut self, session_id: &str) -> ChatResult<Session> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;

        let removed = self.sessions.remove(index);
        if self.active.as_deref() == Some(session_id) {
            self.active = None;
        }
        debug!(session_id, "deleted session");
        Ok(removed)
    }

    /// Remove every session
    pub fn clear_all(&mut self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        self.active = None;
        count
    }

    /// Append a message to the end of a session
    pub fn append_message(&mut self, session_id: &str, message: Message) -> ChatResult<Message> {
        let session = self.get_mut(session_id)?;
        session.messages.push(message.clone());
        Ok(message)
    }

    /// Overwrite the reaction on a message
    pub fn set_reaction(
        &mut self,
        session_id: &str,
        message_id: &str,
        reaction: impl Into<String>,
    ) -> ChatResult<()> {
        let session = self.get_mut(session_id)?;
        let message = session
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| ChatError::MessageNotFound {
                session_id: session_id.to_string(),
                message_id: message_id.to_string(),
            })?;
        message.reaction = Some(reaction.into());
        Ok(())
    }
}
