//! List command - Show every chat, most recent first.

use anyhow::Result;
use clap::Args;

use super::{open_manager, render, GlobalOpts};

#[derive(Args)]
pub struct ListArgs {
    /// Print the listing as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let sessions = manager.list_sessions();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
    } else {
        println!("{}", render::listing(&sessions));
    }
    Ok(())
}
