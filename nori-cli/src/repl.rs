//! Interactive terminal chat.
//!
//! Replies stream to stdout as they arrive. Ctrl-C while a reply is
//! streaming stops it (the partial reply is kept); Ctrl-C at the prompt exits.

use std::io::Write;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use nori_memory::llm::LLMProvider;
use nori_memory::session::Session;
use nori_memory::storage::DocumentBackend;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{Command, FAREWELL_TEXT, HELP_TEXT, NEW_CONVERSATION_TEXT, RESET_TEXT};

/// Whether the loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Terminal front end over one user's session.
pub struct Repl<L: LLMProvider, S: DocumentBackend> {
    session: Session<L, S>,
    user_id: String,
    interrupt: Arc<AtomicBool>,
}

impl<L: LLMProvider, S: DocumentBackend> Repl<L, S> {
    pub fn new(session: Session<L, S>, user_id: impl Into<String>) -> Self {
        Self {
            session,
            user_id: user_id.into(),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Read stdin until `/quit`, EOF or Ctrl-C at the prompt.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = std::io::stdout();

        writeln!(stdout, "Nori - Weight Loss Coach")?;
        writeln!(stdout, "Type /help for commands, /quit to exit\n")?;

        loop {
            write!(stdout, "You: ")?;
            stdout.flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line.context("failed to read stdin")?,
                _ = tokio::signal::ctrl_c() => {
                    writeln!(stdout, "\n{FAREWELL_TEXT}")?;
                    break;
                }
            };
            let Some(line) = line else {
                writeln!(stdout)?;
                break;
            };

            self.interrupt.store(false, Ordering::SeqCst);
            let watcher = {
                let interrupt = Arc::clone(&self.interrupt);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        interrupt.store(true, Ordering::SeqCst);
                    }
                })
            };
            let flow = self.handle_line(&line, &mut stdout).await;
            watcher.abort();

            match flow {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    tracing::error!(error = %e, "exchange failed");
                    writeln!(stdout, "\nSomething went wrong: {e:#}\n")?;
                }
            }
        }

        Ok(())
    }

    /// Handle one line of input, writing everything user-facing to `out`.
    pub async fn handle_line<W: Write + Send>(
        &self,
        line: &str,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        let input = line.trim();
        if input.is_empty() {
            return Ok(Flow::Continue);
        }
        if let Some(command) = Command::parse(input) {
            return self.run_command(command, out).await;
        }

        write!(out, "Nori: ")?;
        out.flush()?;

        let interrupt = Arc::clone(&self.interrupt);
        let exchange = self
            .session
            .chat_stream(&self.user_id, input, |fragment| {
                let written = write!(out, "{fragment}").and_then(|()| out.flush());
                if written.is_err() || interrupt.load(Ordering::SeqCst) {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await?;

        if exchange.interrupted {
            write!(out, " [stopped]")?;
        }
        write!(out, "\n\n")?;
        Ok(Flow::Continue)
    }

    async fn run_command<W: Write + Send>(
        &self,
        command: Command,
        out: &mut W,
    ) -> anyhow::Result<Flow> {
        match command {
            Command::Profile => {
                writeln!(out, "{}", self.session.display_profile(&self.user_id).await?)?;
            }
            Command::NewConversation => {
                self.session.new_conversation(&self.user_id).await?;
                writeln!(out, "{NEW_CONVERSATION_TEXT}")?;
            }
            Command::Reset => {
                self.session.reset(&self.user_id).await?;
                writeln!(out, "{RESET_TEXT}")?;
            }
            Command::Help => writeln!(out, "\n{HELP_TEXT}\n")?,
            Command::Quit => {
                writeln!(out, "{FAREWELL_TEXT}")?;
                return Ok(Flow::Quit);
            }
            Command::Unknown(input) => {
                writeln!(out, "{}", Command::unknown_text(&input))?;
                writeln!(out, "\n{HELP_TEXT}\n")?;
            }
        }
        Ok(Flow::Continue)
    }
}
