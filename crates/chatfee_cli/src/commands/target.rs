//! Resolving chat and message references typed on the command line.

use chatfee_chat::{ChatManager, Message, Session, SessionId, SessionSummary};

use crate::error::CliError;

/// Find the session a reference points at.
///
/// Tried in order: exact id, 1-based position in the listing, unique id
/// prefix.
pub fn resolve_in(sessions: &[SessionSummary], reference: &str) -> Result<SessionId, CliError> {
    let reference = reference.trim();

    if let Some(session) = sessions.iter().find(|s| s.id == reference) {
        return Ok(session.id.clone());
    }

    if let Ok(index) = reference.parse::<usize>() {
        if index >= 1 && index <= sessions.len() {
            return Ok(sessions[index - 1].id.clone());
        }
    }

    let matches: Vec<_> = sessions
        .iter()
        .filter(|s| !reference.is_empty() && s.id.starts_with(reference))
        .collect();

    match matches.as_slice() {
        [session] => Ok(session.id.clone()),
        [] => Err(CliError::UnknownSession(reference.to_string())),
        _ => Err(CliError::AmbiguousSession {
            reference: reference.to_string(),
            count: matches.len(),
        }),
    }
}

pub fn resolve_session(manager: &ChatManager, reference: &str) -> Result<SessionId, CliError> {
    resolve_in(&manager.list_sessions(), reference)
}

/// Message at a 1-based position in the transcript
pub fn message_at(session: &Session, index: usize) -> Result<&Message, CliError> {
    index
        .checked_sub(1)
        .and_then(|i| session.messages.get(i))
        .ok_or(CliError::UnknownMessage(index))
}
