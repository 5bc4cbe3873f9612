//! Chat command - Interactive chat loop.
//!
//! Plain lines are typed into the shared input buffer and submitted to the
//! selected chat. Lines starting with `/` are loop commands.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use chatfee_chat::{ChatError, ChatManager, SessionId};

use super::react::pick_reaction;
use super::target::{message_at, resolve_session};
use super::theme::{apply, ThemeChoice};
use super::{open_manager, render, GlobalOpts};

const HELP: &str = "\
Commands:
  /new [title]           start a new chat
  /list                  list chats
  /show                  print the current chat
  /switch <chat>         switch to another chat
  /rename <title>        rename the current chat
  /delete                delete the current chat
  /react <n> <emoji|1-5> react to message n
  /theme [light|dark]    toggle or set the display mode
  /quit                  leave";

#[derive(Args)]
pub struct ChatArgs {
    /// Chat to open (defaults to the most recent, or a new one)
    session: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    New(Option<String>),
    List,
    Show,
    Switch(String),
    Rename(String),
    Delete,
    React { message: usize, reaction: String },
    Theme(Option<ThemeChoice>),
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput {
    Text(String),
    Command(ReplCommand),
    Invalid(String),
}

pub fn parse_line(line: &str) -> ReplInput {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplInput::Text(line.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    let parsed = match name {
        "new" => ReplCommand::New(Some(rest.to_string()).filter(|t| !t.is_empty())),
        "list" | "ls" => ReplCommand::List,
        "show" => ReplCommand::Show,
        "switch" | "open" if !rest.is_empty() => ReplCommand::Switch(rest.to_string()),
        "switch" | "open" => return ReplInput::Invalid("Usage: /switch <chat>".to_string()),
        "rename" if !rest.is_empty() => ReplCommand::Rename(rest.to_string()),
        "rename" => return ReplInput::Invalid("Usage: /rename <title>".to_string()),
        "delete" => ReplCommand::Delete,
        "react" => {
            let mut parts = rest.split_whitespace();
            match (parts.next().and_then(|n| n.parse().ok()), parts.next()) {
                (Some(message), Some(reaction)) => ReplCommand::React {
                    message,
                    reaction: reaction.to_string(),
                },
                _ => return ReplInput::Invalid("Usage: /react <n> <emoji|1-5>".to_string()),
            }
        }
        "theme" => match rest.to_ascii_lowercase().as_str() {
            "" => ReplCommand::Theme(None),
            "light" => ReplCommand::Theme(Some(ThemeChoice::Light)),
            "dark" => ReplCommand::Theme(Some(ThemeChoice::Dark)),
            "toggle" => ReplCommand::Theme(Some(ThemeChoice::Toggle)),
            other => return ReplInput::Invalid(format!("Unknown display mode: {}", other)),
        },
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => return ReplInput::Invalid(format!("Unknown command /{}; try /help", other)),
    };
    ReplInput::Command(parsed)
}

pub async fn execute(args: ChatArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;

    let session_id = match &args.session {
        Some(reference) => resolve_session(&manager, reference)?,
        None => match manager.sessions().first() {
            Some(session) => session.id.clone(),
            None => manager.new_session().id,
        },
    };
    manager.select_session(&session_id)?;
    println!("{}", render::transcript(&manager.get_session(&session_id)?));
    println!("Type a message, or /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&manager)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ReplInput::Text(text) => send_text(&manager, &text).await,
            ReplInput::Command(ReplCommand::Quit) => break,
            ReplInput::Command(command) => {
                if let Err(e) = run_command(&manager, command) {
                    println!("⚠️  {}", e);
                }
            }
            ReplInput::Invalid(message) => println!("⚠️  {}", message),
        }
    }

    Ok(())
}

fn prompt(manager: &ChatManager) -> Result<()> {
    let title = manager
        .active_session()
        .map(|s| s.title)
        .unwrap_or_else(|| "no chat".to_string());
    print!("{}> ", title);
    std::io::stdout().flush()?;
    Ok(())
}

async fn send_text(manager: &ChatManager, text: &str) {
    manager.bridge().set_input(text);
    if manager.active_session().is_some() && !text.trim().is_empty() {
        println!("assistant is typing...");
    }

    match manager.submit_input().await {
        Ok(outcome) => println!("{}", render::outcome(&outcome)),
        Err(ChatError::EmptyMessage) => {}
        Err(ChatError::NoActiveSession) => {
            println!("No chat selected. Use /new or /switch <chat>.")
        }
        Err(e) => println!("⚠️  {}", e),
    }
}

fn active_id(manager: &ChatManager) -> Result<SessionId> {
    Ok(manager
        .active_session()
        .map(|s| s.id)
        .ok_or(ChatError::NoActiveSession)?)
}

fn run_command(manager: &ChatManager, command: ReplCommand) -> Result<()> {
    match command {
        ReplCommand::New(title) => {
            let session = manager.new_session();
            if let Some(title) = title {
                manager.rename_session(&session.id, &title)?;
            }
            println!("Started a new chat ({})", render::short_id(&session.id));
        }
        ReplCommand::List => println!("{}", render::listing(&manager.list_sessions())),
        ReplCommand::Show => {
            let session_id = active_id(manager)?;
            println!("{}", render::transcript(&manager.get_session(&session_id)?));
        }
        ReplCommand::Switch(reference) => {
            let session_id = resolve_session(manager, &reference)?;
            manager.select_session(&session_id)?;
            println!("{}", render::transcript(&manager.get_session(&session_id)?));
        }
        ReplCommand::Rename(title) => {
            manager.rename_session(&active_id(manager)?, &title)?;
        }
        ReplCommand::Delete => {
            let session_id = active_id(manager)?;
            manager.delete_session(&session_id)?;
            println!("Deleted. Use /new or /switch <chat> to continue.");
        }
        ReplCommand::React { message, reaction } => {
            let session = manager.get_session(&active_id(manager)?)?;
            let target = message_at(&session, message)?;
            let reaction = pick_reaction(&reaction);
            manager.react(&session.id, &target.id, &reaction)?;
            println!("{}", render::message_line(message, target));
        }
        ReplCommand::Theme(choice) => {
            let mode = match choice {
                Some(choice) => apply(manager, choice),
                None => apply(manager, ThemeChoice::Toggle),
            };
            println!("Display mode: {}", mode.as_str());
        }
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => {}
    }
    Ok(())
}
