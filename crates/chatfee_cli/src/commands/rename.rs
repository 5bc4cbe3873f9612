//! Rename command - Give a chat a new title.

use anyhow::Result;
use clap::Args;

use super::target::resolve_session;
use super::{open_manager, GlobalOpts};

#[derive(Args)]
pub struct RenameArgs {
    /// Chat id, id prefix, or list number
    session: String,

    /// New title
    #[arg(required = true, num_args = 1..)]
    title: Vec<String>,
}

pub async fn execute(args: RenameArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let session_id = resolve_session(&manager, &args.session)?;
    let title = args.title.join(" ");

    manager.rename_session(&session_id, &title)?;
    println!("✅ Renamed to '{}'", title.trim());
    Ok(())
}
