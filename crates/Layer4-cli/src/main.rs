//! Savepoint CLI - Main entry point

mod commands;
mod watcher;

use clap::{Parser, Subcommand};
use savepoint_core::repository_root;
use savepoint_engine::{CommitOutcome, Engine};
use savepoint_foundation::{ConfigLoader, SavepointConfig, SecretStore};
use savepoint_provider::{MessageGenerator, ProviderRegistry};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Savepoint - save-triggered auto-commit with AI-generated messages
#[derive(Parser, Debug)]
#[command(name = "savepoint")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Workspace to operate on (defaults to the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the workspace and commit on save (default)
    Watch,

    /// Run one commit cycle now
    Commit,

    /// Manage AI providers
    Provider {
        #[command(subcommand)]
        action: ProviderAction,
    },

    /// Manage models
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Manage provider credentials
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Show the resolved configuration
    Status,
}

#[derive(Subcommand, Debug)]
enum ProviderAction {
    /// List providers with enablement and availability
    List,
    /// Set the active provider
    Select { id: String },
    /// Enable a provider for selection and fallback
    Enable { id: String },
    /// Disable a provider
    Disable { id: String },
}

#[derive(Subcommand, Debug)]
enum ModelAction {
    /// Set the global model override, or a provider's model with --provider
    Set {
        model: String,
        #[arg(long)]
        provider: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    /// Store an API key for a provider (read from stdin)
    SetKey { provider: String },
    /// Switch a provider to CLI login after verifying its CLI exists
    Login { provider: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let workspace = match args.workspace {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let config = ConfigLoader::new(&workspace).load_all()?;
    let secrets = SecretStore::global()?;
    let registry = ProviderRegistry::from_config(&config, &secrets);

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(workspace, config, registry).await,
        Command::Commit => commit_once(workspace, config, registry).await,
        Command::Provider { action } => match action {
            ProviderAction::List => commands::provider_list(&workspace, &registry).await,
            ProviderAction::Select { id } => commands::provider_select(&workspace, &registry, &id),
            ProviderAction::Enable { id } => {
                commands::provider_set_enabled(&workspace, &registry, &id, true)
            }
            ProviderAction::Disable { id } => {
                commands::provider_set_enabled(&workspace, &registry, &id, false)
            }
        },
        Command::Model { action } => match action {
            ModelAction::Set { model, provider } => {
                commands::model_set(&workspace, &registry, &model, provider.as_deref())
            }
        },
        Command::Auth { action } => match action {
            AuthAction::SetKey { provider } => {
                commands::auth_set_key(&registry, &secrets, &provider).await
            }
            AuthAction::Login { provider } => {
                commands::auth_login(&workspace, &registry, &provider).await
            }
        },
        Command::Status => commands::status(&workspace, &registry).await,
    }
}

/// Watch mode: enable the engine, feed it save events, shut down on Ctrl-C
async fn watch(
    workspace: PathBuf,
    config: SavepointConfig,
    registry: ProviderRegistry,
) -> anyhow::Result<()> {
    if !config.enabled {
        anyhow::bail!("Savepoint is disabled in settings (enabled = false)");
    }
    let Some(repo) = repository_root(&workspace) else {
        anyhow::bail!("{} is not inside a git repository", workspace.display());
    };

    let engine = Engine::with_process_runner(config, MessageGenerator::new(registry));

    // print status transitions as they happen
    let mut status = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = status.recv().await {
            match event.detail {
                Some(detail) => info!("[{}] {}", event.status.as_str(), detail),
                None => info!("[{}]", event.status.as_str()),
            }
        }
    });

    let (_watcher, mut saves) = watcher::watch_workspace(&repo)?;
    engine.enable(&repo).await;
    info!("Watching {} (Ctrl-C to stop)", repo.display());

    loop {
        tokio::select! {
            Some(path) = saves.recv() => {
                engine.on_save(&path).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                engine.shutdown().await;
                break;
            }
        }
    }

    Ok(())
}

/// Manual trigger: one commit cycle against the workspace repository
async fn commit_once(
    workspace: PathBuf,
    config: SavepointConfig,
    registry: ProviderRegistry,
) -> anyhow::Result<()> {
    let Some(repo) = repository_root(&workspace) else {
        anyhow::bail!("{} is not inside a git repository", workspace.display());
    };

    let engine = Engine::with_process_runner(config, MessageGenerator::new(registry));

    match engine.commit_now(Some(&repo)).await? {
        CommitOutcome::Committed { hash, message, files } => {
            println!("Committed {} ({} files): {}", hash, files, message);
        }
        CommitOutcome::Skipped(reason) => {
            println!("Nothing to commit: {:?}", reason);
        }
        CommitOutcome::AlreadyRunning => {
            println!("A commit is already in flight");
        }
    }

    Ok(())
}
