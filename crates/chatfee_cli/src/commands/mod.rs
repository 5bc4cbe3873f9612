//! CLI command definitions.
//!
//! This module defines the command structure for the ChatFee CLI.
//! Each subcommand maps to one user-facing chat operation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use chatfee_chat::{ChatConfig, ChatManager, SpeechPlayback};

use crate::speech::CommandSynthesizer;

pub mod chat;
pub mod clear;
pub mod delete;
pub mod list;
pub mod new;
pub mod react;
pub mod rename;
pub mod render;
pub mod send;
pub mod show;
pub mod target;
pub mod theme;

/// ChatFee - chat with an assistant from the terminal
#[derive(Parser)]
#[command(name = "chatfee")]
#[command(version, about = "ChatFee - chat with an assistant from the terminal")]
#[command(long_about = r#"
ChatFee keeps any number of independent chats with an assistant backend and
stores them on disk between runs.

CHATS:
  new      → Start a new chat
  list     → List chats, most recent first
  show     → Print a chat transcript
  rename   → Rename a chat
  delete   → Delete a chat
  clear    → Delete every chat
  send     → Send one message and print the reply
  react    → React to a message with an emoji
  theme    → Show or change the display mode
  chat     → Interactive chat loop

Chats can be referenced by full id, id prefix, or their number in `list`.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or unknown chat/message
  3 - Delivery failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Clone, Debug, Default)]
pub struct GlobalOpts {
    /// Workspace holding `.chatfee/` (defaults to the current directory)
    #[arg(short, long, global = true, env = "CHATFEE_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Chat server base URL, overriding settings
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Program that reads replies aloud from stdin, e.g. "espeak --stdin"
    #[arg(long, global = true, env = "CHATFEE_SPEAK_CMD")]
    pub speak_cmd: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new chat
    New(new::NewArgs),

    /// List chats, most recent first
    List(list::ListArgs),

    /// Print a chat transcript
    Show(show::ShowArgs),

    /// Rename a chat
    Rename(rename::RenameArgs),

    /// Delete a chat
    Delete(delete::DeleteArgs),

    /// Delete every chat
    Clear(clear::ClearArgs),

    /// Send one message and print the reply
    Send(send::SendArgs),

    /// React to a message
    React(react::ReactArgs),

    /// Show or change the display mode
    Theme(theme::ThemeArgs),

    /// Interactive chat loop
    Chat(chat::ChatArgs),
}

impl GlobalOpts {
    pub fn workspace_root(&self) -> Result<PathBuf> {
        match &self.workspace {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir().context("Failed to read current directory"),
        }
    }

    /// Settings for the workspace with command-line overrides applied
    pub fn config(&self) -> Result<ChatConfig> {
        let mut config = ChatConfig::from_settings(&self.workspace_root()?);
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        Ok(config)
    }
}

/// Open the workspace's chats and wire up optional speech playback
pub fn open_manager(global: &GlobalOpts) -> Result<ChatManager> {
    let config = global.config()?;
    let manager = ChatManager::from_config(&config).context("Failed to set up chat delivery")?;

    match global.speak_cmd.as_deref().and_then(CommandSynthesizer::parse) {
        Some(synthesizer) => {
            manager
                .bridge()
                .add_reply_listener(Arc::new(SpeechPlayback::new(synthesizer, true)));
        }
        None if config.speak_replies => {
            warn!("speakReplies is set but no --speak-cmd was given");
        }
        None => {}
    }

    Ok(manager)
}
