//! ChatFee CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or unknown chat/message
//! - 3: Delivery failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod error;
mod speech;

use chatfee_chat::ChatError;
use commands::{Cli, Commands};
use error::CliError;

/// Script-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const DELIVERY_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::New(args) => commands::new::execute(args, &cli.global).await,
        Commands::List(args) => commands::list::execute(args, &cli.global).await,
        Commands::Show(args) => commands::show::execute(args, &cli.global).await,
        Commands::Rename(args) => commands::rename::execute(args, &cli.global).await,
        Commands::Delete(args) => commands::delete::execute(args, &cli.global).await,
        Commands::Clear(args) => commands::clear::execute(args, &cli.global).await,
        Commands::Send(args) => commands::send::execute(args, &cli.global).await,
        Commands::React(args) => commands::react::execute(args, &cli.global).await,
        Commands::Theme(args) => commands::theme::execute(args, &cli.global).await,
        Commands::Chat(args) => commands::chat::execute(args, &cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_directives = if cli.verbose {
        "chatfee=debug,warn"
    } else if cli.quiet {
        "chatfee=warn,warn"
    } else {
        "chatfee=info,warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    // Logs go to stderr so transcripts on stdout stay clean
    let log_result = if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<CliError>() {
        return match err {
            CliError::DeliveryFailed(_) => ExitCodes::DELIVERY_FAILURE,
            _ => ExitCodes::INVALID_ARGS,
        };
    }

    if let Some(err) = e.downcast_ref::<ChatError>() {
        if err.is_not_found()
            || matches!(err, ChatError::EmptyMessage | ChatError::NoActiveSession)
        {
            return ExitCodes::INVALID_ARGS;
        }
        if err.is_delivery() {
            return ExitCodes::DELIVERY_FAILURE;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
