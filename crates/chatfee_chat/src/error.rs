//! Error types for the chat system.

use thiserror::Error;

/// Chat system errors
#[derive(Error, Debug)]
pub enum ChatError {
    /// Message text was empty or whitespace-only
    #[error("Message is empty")]
    EmptyMessage,

    /// A send was requested with no session selected
    #[error("No active chat session")]
    NoActiveSession,

    /// Session not found
    #[error("Chat session not found: {0}")]
    SessionNotFound(String),

    /// Message not found within a session
    #[error("Message {message_id} not found in session {session_id}")]
    MessageNotFound {
        session_id: String,
        message_id: String,
    },

    /// Delivery provider is missing required configuration
    #[error("Delivery provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Delivery failed (bad status, malformed body, exhausted retries)
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Transport-level HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChatError {
    /// Whether the error means the target session or message no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::MessageNotFound { .. }
        )
    }

    /// Whether the error came from the delivery collaborator.
    pub fn is_delivery(&self) -> bool {
        matches!(
            self,
            Self::Delivery(_) | Self::Http(_) | Self::ProviderNotConfigured(_)
        )
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<tempfile::PersistError> for ChatError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
