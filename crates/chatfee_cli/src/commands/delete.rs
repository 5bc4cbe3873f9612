//! Delete command - Remove one chat and its messages.

use anyhow::Result;
use clap::Args;

use super::target::resolve_session;
use super::{open_manager, GlobalOpts};

#[derive(Args)]
pub struct DeleteArgs {
    /// Chat id, id prefix, or list number
    session: String,
}

pub async fn execute(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let session_id = resolve_session(&manager, &args.session)?;
    let session = manager.get_session(&session_id)?;

    manager.delete_session(&session_id)?;
    println!("🗑️  Deleted '{}'", session.title);
    Ok(())
}
