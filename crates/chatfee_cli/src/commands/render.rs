//! Plain-text rendering of chats for the terminal.

use chatfee_chat::{DeliveryOutcome, Message, MessageRole, Session, SessionSummary};

/// Width of the id column in listings
const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// One line per chat, numbered for use as a reference
pub fn listing(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "No chats yet. Start one with `chatfee new`.".to_string();
    }

    sessions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if s.active { "*" } else { " " };
            let waiting = if s.awaiting_reply { "  (typing...)" } else { "" };
            format!(
                "{:>3}. {} {:<8}  {}  [{} messages]{}",
                i + 1,
                marker,
                short_id(&s.id),
                s.title,
                s.message_count,
                waiting
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn message_line(index: usize, message: &Message) -> String {
    let speaker = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };
    let reaction = message
        .reaction
        .as_deref()
        .map(|r| format!("  {}", r))
        .unwrap_or_default();
    format!(
        "[{}] {} {}: {}{}",
        index,
        message.created_at.format("%H:%M"),
        speaker,
        message.content,
        reaction
    )
}

pub fn transcript(session: &Session) -> String {
    let mut lines = vec![format!("{} ({})", session.title, short_id(&session.id))];
    if session.messages.is_empty() {
        lines.push("  (no messages)".to_string());
    }
    lines.extend(
        session
            .messages
            .iter()
            .enumerate()
            .map(|(i, m)| format!("  {}", message_line(i + 1, m))),
    );
    lines.join("\n")
}

/// Assistant text of a finished delivery, if it landed anywhere
pub fn outcome(outcome: &DeliveryOutcome) -> String {
    match outcome {
        DeliveryOutcome::Replied(m) | DeliveryOutcome::Failed(m) => {
            format!("assistant: {}", m.content)
        }
        DeliveryOutcome::Dropped => "(chat was deleted before the reply arrived)".to_string(),
    }
}
