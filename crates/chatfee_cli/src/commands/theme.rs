//! Theme command - Show or change the display mode.

use anyhow::Result;
use clap::{Args, ValueEnum};

use chatfee_chat::{ChatManager, DisplayMode};

use super::{open_manager, GlobalOpts};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    Light,
    Dark,
    Toggle,
}

#[derive(Args)]
pub struct ThemeArgs {
    /// New display mode; omit to print the current one
    #[arg(value_enum)]
    mode: Option<ThemeChoice>,
}

/// Apply a choice and return the resulting mode
pub fn apply(manager: &ChatManager, choice: ThemeChoice) -> DisplayMode {
    match choice {
        ThemeChoice::Light => {
            manager.set_display_mode(DisplayMode::Light);
            DisplayMode::Light
        }
        ThemeChoice::Dark => {
            manager.set_display_mode(DisplayMode::Dark);
            DisplayMode::Dark
        }
        ThemeChoice::Toggle => manager.toggle_display_mode(),
    }
}

pub async fn execute(args: ThemeArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;

    let mode = match args.mode {
        Some(choice) => apply(&manager, choice),
        None => manager.display_mode(),
    };
    println!("{}", mode.as_str());
    Ok(())
}
