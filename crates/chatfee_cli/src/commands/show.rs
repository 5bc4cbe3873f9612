//! Show command - Print a chat transcript.

use anyhow::Result;
use clap::Args;

use super::target::resolve_session;
use super::{open_manager, render, GlobalOpts};

#[derive(Args)]
pub struct ShowArgs {
    /// Chat id, id prefix, or list number
    session: String,

    /// Print the chat as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let session_id = resolve_session(&manager, &args.session)?;
    let session = manager.get_session(&session_id)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        println!("{}", render::transcript(&session));
    }
    Ok(())
}
