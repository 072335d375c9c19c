mod commands;
mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{BackendConfig, EditorSession, HttpAdminBackend};
use shared::domain::Scope;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agent-admin", about = "Manage agents on an agent admin server")]
struct Cli {
    /// Settings file read in addition to `agent-admin.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    /// Agent scope: local or shared.
    #[arg(long)]
    scope: Option<Scope>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List agents in the scope.
    Agents,
    /// List personas in the scope.
    Personas,
    /// List the command catalog, grouped by provider.
    Commands,
    /// Print an agent as JSON.
    Show { name: String },
    Create(commands::CreateArgs),
    Edit(commands::EditArgs),
    /// Import every agent definition found in a server-side directory.
    ScanImport { directory: String },
    /// Import an agent from a GitHub repository path such as `owner/repo`.
    GithubImport {
        repo_path: String,
        #[arg(long)]
        tag: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = config::load_settings(cli.config.as_deref())
        .context("failed to load settings")?
        .with_overrides(cli.server_url, cli.scope);
    info!(server_url = %settings.server_url, scope = %settings.scope, "agent-admin starting");

    let backend = HttpAdminBackend::new(
        BackendConfig::new(settings.server_url.clone()).with_timeout(settings.request_timeout()),
    )
    .context("invalid server url")?;
    let mut session = EditorSession::new(Arc::new(backend), settings.scope);
    session.mount().await;

    match cli.command {
        Command::Agents => commands::list_agents(&session),
        Command::Personas => commands::list_personas(&session),
        Command::Commands => commands::list_commands(&session),
        Command::Show { name } => commands::show(&mut session, &name).await,
        Command::Create(args) => commands::create(&mut session, args).await,
        Command::Edit(args) => commands::edit(&mut session, args).await,
        Command::ScanImport { directory } => commands::scan_import(&mut session, &directory).await,
        Command::GithubImport { repo_path, tag } => {
            commands::github_import(&mut session, &repo_path, tag.as_deref()).await
        }
    }
}
