//! Text-to-speech through an external program.

use std::io::Write;
use std::process::{Command, Stdio};

use chatfee_chat::{ChatError, ChatResult, SpeechSynthesizer};
use tracing::debug;

/// Pipes each reply to the stdin of a speech program such as
/// `espeak --stdin` or `say`.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    /// Parse a command line; the first word is the program
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&self, text: &str) -> ChatResult<()> {
        debug!(program = %self.program, "speaking reply");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // Closing stdin before waiting lets the program see end of input.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };

        let status = child.wait()?;
        written?;
        if !status.success() {
            return Err(ChatError::Delivery(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}
