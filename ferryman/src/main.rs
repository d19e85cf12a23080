//! Ferryman - configuration synchronization manager for the Ferron proxy
//!
//! This is the main entry point for the Ferryman CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ferryman_core::{EntityConfig, EntityKind, GlobalSettings, Settings, VirtualHostConfig};
use ferryman_engine::{render, DockerReloader, MemoryStore, ProxyReloader, SyncEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod update;

#[derive(Parser)]
#[command(name = "ferryman")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML settings file (defaults + FERRYMAN_* env otherwise)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a configuration document and report on it
    Check {
        /// Path to a .kdl document
        file: PathBuf,
    },

    /// Render a configuration block to stdout
    Render {
        /// JSON file describing a virtual host; renders the default global
        /// block when omitted
        entity: Option<PathBuf>,
    },

    /// Signal the proxy container to reload its configuration
    Reload,

    /// Ensure the configuration tree exists and reconcile it
    Resync,

    /// Check whether a newer release is available
    #[command(name = "check-update")]
    CheckUpdate,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    match &cli.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(Settings::from_env()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Check { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let doc = ferryman_kdl::parse(&text)
                .with_context(|| format!("{} is not a valid document", file.display()))?;
            println!(
                "{}: OK ({} top-level block{})",
                file.display(),
                doc.nodes.len(),
                if doc.nodes.len() == 1 { "" } else { "s" }
            );
        }

        Commands::Render { entity } => {
            let text = match entity {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let config: VirtualHostConfig = serde_json::from_str(&json)
                        .with_context(|| format!("{} is not a valid entity", path.display()))?;
                    config.validate()?;
                    render(config.kind().into(), &config.into())?
                }
                None => render(
                    EntityKind::Global,
                    &EntityConfig::Global(GlobalSettings::default()),
                )?,
            };
            print!("{text}");
        }

        Commands::Reload => {
            let reloader = DockerReloader::new(settings.container_name.clone());
            reloader.reload().await?;
            println!("reloaded container '{}'", settings.container_name);
        }

        Commands::Resync => {
            tracing::info!(root = %settings.config_root.display(), "starting reconciliation");
            let reloader = DockerReloader::new(settings.container_name.clone());
            let engine = SyncEngine::new(settings, Arc::new(MemoryStore::new()), Arc::new(reloader));
            engine.resync_all().await?;
            println!(
                "configuration tree at {} is reconciled",
                engine.settings().config_root.display()
            );
        }

        Commands::CheckUpdate => {
            let checker = update::UpdateChecker::for_repository(env!("CARGO_PKG_REPOSITORY"))?;
            let status = checker.check().await?;
            if status.update_available {
                println!(
                    "update available: {} -> {}",
                    status.current_version, status.latest.version
                );
                if let Some(url) = &status.latest.release_url {
                    println!("release notes: {url}");
                }
            } else {
                println!("up to date ({})", status.current_version);
            }
        }
    }

    Ok(())
}
