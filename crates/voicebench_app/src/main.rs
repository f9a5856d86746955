mod config;
mod render;
mod view;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use voicebench_core::{Agent, EntityId, Persona, TestSuite};
use voicebench_engine::{DashboardContext, SessionProvider, StaticSessionProvider};
use voicebench_logging::vb_info;

use config::{parse_level, DashboardConfig, DEFAULT_CONFIG_PATH};
use view::Request;

/// Terminal dashboard for voice-agent test suites, agents and personas.
#[derive(Debug, Parser)]
#[command(name = "voicebench", version)]
struct Cli {
    /// RON configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Access token; takes precedence over the config file.
    #[arg(long, env = "VOICEBENCH_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Log level override (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
    /// End the session when the command finishes.
    #[arg(long)]
    sign_out: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show a list and follow its background jobs until interrupted.
    Watch { kind: KindArg },
    /// Flip a row's active flag.
    Toggle { kind: KindArg, id: String },
    Delete { kind: KindArg, id: String },
    /// Regenerate a test suite, verify an agent or preview a persona's voice.
    Trigger { kind: KindArg, id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    TestSuites,
    Agents,
    Personas,
}

impl Command {
    fn split(self) -> (KindArg, Request) {
        match self {
            Command::Watch { kind } => (kind, Request::Watch),
            Command::Toggle { kind, id } => (kind, Request::Toggle(EntityId::new(id))),
            Command::Delete { kind, id } => (kind, Request::Delete(EntityId::new(id))),
            Command::Trigger { kind, id } => (kind, Request::Trigger(EntityId::new(id))),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = DashboardConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();
    let level = match &cli.log_level {
        Some(level) => parse_level(level)?,
        None => config.log_level()?,
    };
    voicebench_logging::initialize(config.log.destination.into(), level, &config.log_path());
    if !from_file {
        vb_info!("No config at {:?}, using defaults", cli.config);
    }

    let settings = config.api_settings()?;
    let provider: Arc<dyn SessionProvider> =
        match cli.token.clone().or_else(|| config.access_token.clone()) {
            Some(token) => Arc::new(StaticSessionProvider::from_token(token)),
            None => Arc::new(StaticSessionProvider::new(None)),
        };
    let context = DashboardContext::init(provider, settings)
        .await
        .context("sign in first (set VOICEBENCH_TOKEN or access_token)")?;
    vb_info!("Dashboard started for org {}", context.organization_id());

    let (kind, request) = cli.command.split();
    let outcome = match kind {
        KindArg::TestSuites => view::run::<TestSuite>(&context, &config, request).await,
        KindArg::Agents => view::run::<Agent>(&context, &config, request).await,
        KindArg::Personas => view::run::<Persona>(&context, &config, request).await,
    };

    context.teardown(cli.sign_out).await?;
    outcome
}
