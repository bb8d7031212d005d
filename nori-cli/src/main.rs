//! `nori` - weight-loss coaching assistant with memory.
//!
//! Settings come from flags, then environment variables, then a `.env` file
//! in the working directory. Without `ANTHROPIC_API_KEY` the assistant runs
//! on the deterministic simulated provider.

mod commands;
mod repl;
mod web;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nori_memory::constants::{HISTORY_TURNS_COUNT_DEFAULT, HISTORY_TURNS_COUNT_MAX};
use nori_memory::llm::{AnthropicProvider, LLMProvider, SimLLMProvider, ANTHROPIC_MODEL_DEFAULT};
use nori_memory::profile::ProfileSchema;
use nori_memory::session::{Session, SessionConfig};
use nori_memory::storage::FileBackend;
use nori_memory::template::PromptTemplate;
use tracing_subscriber::EnvFilter;

use crate::commands::RESET_TEXT;
use crate::repl::Repl;

type AppSession = Session<Arc<dyn LLMProvider>, FileBackend>;

#[derive(Parser, Debug)]
#[command(name = "nori", version, about = "Weight-loss coaching assistant that remembers you")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Args, Debug)]
struct Settings {
    /// Directory holding one sub-directory per user
    #[arg(long, env = "NORI_DATA_DIR", default_value = "data/users", global = true)]
    data_dir: PathBuf,

    /// Directory with system.txt (and optional resources.txt); built-in prompt if unset
    #[arg(long, env = "NORI_PROMPTS_DIR", global = true)]
    prompts_dir: Option<PathBuf>,

    /// Profile schema: "weight-loss" or "health"
    #[arg(long, env = "NORI_SCHEMA", default_value = "weight-loss", global = true)]
    schema: String,

    /// Anthropic model id
    #[arg(long, env = "NORI_MODEL", default_value = ANTHROPIC_MODEL_DEFAULT, global = true)]
    model: String,

    /// Trailing turns sent to the model
    #[arg(long, env = "NORI_HISTORY_LIMIT", default_value_t = HISTORY_TURNS_COUNT_DEFAULT, global = true)]
    history_limit: usize,

    /// User id (defaults to "default" in the terminal, "web_user" over HTTP)
    #[arg(long, env = "NORI_USER", global = true)]
    user: Option<String>,

    /// Anthropic API key; the simulated provider is used when absent
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Seed for the simulated provider
    #[arg(long, env = "DST_SEED", default_value_t = 42, global = true)]
    sim_seed: u64,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Chat in the terminal (default)
    Chat,

    /// Serve the chat over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 5001)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Print the stored profile
    Profile,

    /// Reset the profile and clear the conversation
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so it feeds the env fallbacks
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(CliCommand::Chat);
    init_tracing(&command);

    let session = build_session(&cli.settings).await?;

    match command {
        CliCommand::Chat => {
            let user_id = cli.settings.user.unwrap_or_else(|| "default".to_string());
            Repl::new(session, user_id).run().await
        }
        CliCommand::Serve { port, host } => {
            let user_id = cli.settings.user.unwrap_or_else(|| "web_user".to_string());
            serve(session, user_id, &host, port).await
        }
        CliCommand::Profile => {
            let user_id = cli.settings.user.as_deref().unwrap_or("default");
            println!("{}", session.display_profile(user_id).await?);
            Ok(())
        }
        CliCommand::Reset => {
            let user_id = cli.settings.user.as_deref().unwrap_or("default");
            session.reset(user_id).await?;
            println!("{RESET_TEXT}");
            Ok(())
        }
    }
}

/// Logs go to stderr. The terminal commands default to `warn` so log lines
/// stay out of the conversation.
fn init_tracing(command: &CliCommand) {
    let default_filter = match command {
        CliCommand::Serve { .. } => "info",
        _ => "warn",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn build_session(settings: &Settings) -> anyhow::Result<AppSession> {
    let schema = ProfileSchema::from_name(&settings.schema).with_context(|| {
        format!(
            "unknown profile schema {:?} (expected \"weight-loss\" or \"health\")",
            settings.schema
        )
    })?;

    let template = match &settings.prompts_dir {
        Some(dir) => PromptTemplate::load(dir)
            .await
            .with_context(|| format!("failed to load prompts from {}", dir.display()))?,
        None => PromptTemplate::builtin(),
    };

    anyhow::ensure!(
        (1..=HISTORY_TURNS_COUNT_MAX).contains(&settings.history_limit),
        "history limit must be between 1 and {HISTORY_TURNS_COUNT_MAX}, got {}",
        settings.history_limit
    );
    let config = SessionConfig::default().with_history_limit(settings.history_limit);

    let provider = build_provider(settings);
    let backend = Arc::new(FileBackend::new(&settings.data_dir));

    tracing::info!(
        provider = provider.name(),
        schema = schema.name(),
        data_dir = %settings.data_dir.display(),
        "session ready"
    );

    Ok(Session::new(provider, backend, schema, config).with_template(template))
}

fn build_provider(settings: &Settings) -> Arc<dyn LLMProvider> {
    match settings.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => Arc::new(AnthropicProvider::new(key).with_model(&settings.model)),
        None => {
            tracing::warn!(
                seed = settings.sim_seed,
                "ANTHROPIC_API_KEY not set, replies come from the simulated provider"
            );
            Arc::new(SimLLMProvider::with_seed(settings.sim_seed))
        }
    }
}

async fn serve(session: AppSession, user_id: String, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, user_id, "listening");

    axum::serve(listener, web::router(session, user_id))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("server error")
}
