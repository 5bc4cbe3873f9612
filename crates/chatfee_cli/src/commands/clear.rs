//! Clear command - Remove every chat.

use std::io::{BufRead, Write};

use anyhow::Result;
use clap::Args;

use super::{open_manager, GlobalOpts};
use crate::error::CliError;

#[derive(Args)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

pub async fn execute(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let count = manager.sessions().len();

    if count == 0 {
        println!("No chats to clear.");
        return Ok(());
    }

    if !args.yes && !confirm(&format!("Delete all {} chats? [y/N] ", count))? {
        return Err(CliError::NotConfirmed(count).into());
    }

    let removed = manager.clear_all();
    println!("🗑️  Cleared {} chats", removed);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
