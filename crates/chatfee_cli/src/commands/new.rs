//! New command - Start a new chat.

use anyhow::Result;
use clap::Args;

use super::{open_manager, render, GlobalOpts};

#[derive(Args)]
pub struct NewArgs {
    /// Title for the chat (defaults to "New Chat")
    #[arg(short, long)]
    title: Option<String>,
}

pub async fn execute(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let session = manager.new_session();

    let title = match args.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => {
            manager.rename_session(&session.id, title)?;
            title.to_string()
        }
        _ => session.title.clone(),
    };

    println!("✅ Started '{}' ({})", title, render::short_id(&session.id));
    println!("   id: {}", session.id);
    Ok(())
}
