//! Errors raised by the CLI itself, on top of [`chatfee_chat::ChatError`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("No chat matches '{0}'")]
    UnknownSession(String),

    #[error("'{reference}' matches {count} chats; use a longer id prefix")]
    AmbiguousSession { reference: String, count: usize },

    #[error("No message #{0} in this chat")]
    UnknownMessage(usize),

    #[error("Not confirmed; pass --yes to clear {0} chats")]
    NotConfirmed(usize),

    #[error("Delivery failed for chat {0}")]
    DeliveryFailed(String),
}
