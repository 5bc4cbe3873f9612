//! React command - Put an emoji reaction on a message.

use anyhow::Result;
use clap::Args;

use chatfee_chat::REACTIONS;

use super::target::{message_at, resolve_session};
use super::{open_manager, GlobalOpts};

#[derive(Args)]
pub struct ReactArgs {
    /// Chat id, id prefix, or list number
    session: String,

    /// Message number as shown by `show`
    message: usize,

    /// Reaction emoji, or 1-5 to pick from 👍 ❤️ 😂 🔥 🤔
    reaction: String,
}

/// Map a palette number to its emoji; anything else is used as given
pub fn pick_reaction(input: &str) -> String {
    let input = input.trim();
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| REACTIONS.get(i))
        .map(|r| r.to_string())
        .unwrap_or_else(|| input.to_string())
}

pub async fn execute(args: ReactArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let session_id = resolve_session(&manager, &args.session)?;
    let session = manager.get_session(&session_id)?;
    let message = message_at(&session, args.message)?;

    let reaction = pick_reaction(&args.reaction);
    manager.react(&session_id, &message.id, &reaction)?;
    println!("{} on message #{}", reaction, args.message);
    Ok(())
}
