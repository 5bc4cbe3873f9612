//! Core types for the chat system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a chat session
pub type SessionId = String;

/// Unique identifier for a message within a session
pub type MessageId = String;

/// Title given to a freshly created session
pub const DEFAULT_TITLE: &str = "New Chat";

/// Assistant text appended when a delivery fails
pub const DELIVERY_FAILURE_TEXT: &str = "⚠️ Error connecting to server";

/// Assistant text appended when the backend answers with an empty reply
pub const EMPTY_REPLY_TEXT: &str = "No response received.";

/// Reactions offered by the reaction picker
pub const REACTIONS: [&str; 5] = ["👍", "❤️", "😂", "🔥", "🤔"];

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message ID (UUID)
    pub id: MessageId,
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Emoji reaction set by the user, latest wins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    /// When the message was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            reaction: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// One conversation thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,
    /// Display title
    pub title: String,
    /// Messages in insertion order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Set on creation until the user names the session
    #[serde(rename = "titleEditing", default, skip_serializing_if = "std::ops::Not::not")]
    pub title_editing: bool,
}

impl Session {
    /// Create an empty session waiting for a title
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            title_editing: true,
        }
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    /// Most recent assistant message, if any
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Display preference persisted alongside the sessions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Light,
    Dark,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown display mode: {}", other)),
        }
    }
}

/// Summary of a session for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    #[serde(rename = "messageCount")]
    pub message_count: usize,
    pub active: bool,
    #[serde(rename = "awaitingReply")]
    pub awaiting_reply: bool,
}
