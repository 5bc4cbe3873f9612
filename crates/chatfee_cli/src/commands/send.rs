//! Send command - Send one message and print the reply.

use anyhow::{Context, Result};
use clap::Args;

use chatfee_chat::DeliveryOutcome;

use super::target::resolve_session;
use super::{open_manager, render, GlobalOpts};
use crate::error::CliError;

#[derive(Args)]
pub struct SendArgs {
    /// Chat id, id prefix, or list number
    session: String,

    /// Message text
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
}

pub async fn execute(args: SendArgs, global: &GlobalOpts) -> Result<()> {
    let manager = open_manager(global)?;
    let session_id = resolve_session(&manager, &args.session)?;

    let outcome = manager
        .send_message(&session_id, &args.text.join(" "))
        .await
        .context("Sending message")?;

    println!("{}", render::outcome(&outcome));

    match outcome {
        DeliveryOutcome::Failed(_) => Err(CliError::DeliveryFailed(session_id).into()),
        _ => Ok(()),
    }
}
