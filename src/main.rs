//! acbuild - Aliucord plugin build tool
//!
//! Command line entry point that sets up logging, locates the workspace
//! and dispatches to the build, catalog and deploy commands.

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use acbuild::commands::{BuildCommand, CatalogCommand, DeployCommand, RestartCommand};
use acbuild::{project, APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "acbuild")]
#[command(author, version, about = "Packages Aliucord plugins, update catalogs and device deployments")]
struct Cli {
    /// Workspace root (defaults to the nearest directory with acbuild.toml)
    #[arg(long, short = 'C', global = true, env = "ACBUILD_ROOT")]
    root: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package units into bundles
    Build {
        /// Unit names (defaults to every unit)
        units: Vec<String>,
    },
    /// Build every deployable unit and write updater.json
    Catalog,
    /// Build a unit and push it to connected devices
    Deploy {
        /// Unit name (defaults to the only unit in the workspace)
        unit: Option<String>,
        /// Device serial, a comma separated list, or "all"
        #[arg(long, env = "ANDROID_SERIAL")]
        device_serial: Option<String>,
        /// Start Aliucord waiting for a debugger
        #[arg(long)]
        wait_for_debugger: bool,
    },
    /// Force restart Aliucord on connected devices
    Restart {
        /// Device serial, a comma separated list, or "all"
        #[arg(long, env = "ANDROID_SERIAL")]
        device_serial: Option<String>,
        /// Start Aliucord waiting for a debugger
        #[arg(long)]
        wait_for_debugger: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    debug!("{} v{} starting", APP_NAME, VERSION);

    if let Err(e) = acbuild_core::init::purge_legacy_cache() {
        warn!("Could not remove legacy download cache: {}", e);
    }

    let root = match cli.root {
        Some(root) => root,
        None => {
            let cwd = std::env::current_dir().context("Failed to read the current directory")?;
            project::find_workspace_root(&cwd)
        }
    };

    match cli.command {
        Commands::Build { units } => {
            BuildCommand { root, units }.execute().await?;
        }
        Commands::Catalog => {
            CatalogCommand { root }.execute().await?;
        }
        Commands::Deploy {
            unit,
            device_serial,
            wait_for_debugger,
        } => {
            DeployCommand {
                root,
                unit,
                device_serial,
                wait_for_debugger,
            }
            .execute()
            .await?;
        }
        Commands::Restart {
            device_serial,
            wait_for_debugger,
        } => {
            RestartCommand {
                root,
                device_serial,
                wait_for_debugger,
            }
            .execute()
            .await?;
        }
    }

    Ok(())
}
