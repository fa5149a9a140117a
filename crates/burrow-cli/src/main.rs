//! burrow - SSH-accessible dev container manager CLI

mod commands;

use anyhow::Context;
use burrow_config::GlobalConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "burrow")]
#[command(author, version, about = "SSH-accessible dev container manager", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the container engine (docker or podman)
    #[arg(long, global = true, value_parser = ["docker", "podman"])]
    engine: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List managed containers and their SSH endpoints
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Create a container, optionally cloning a repository into it
    Create {
        /// Repository URL to clone (https or SCP-style)
        #[arg(long)]
        repo: Option<String>,
        /// Access token for private repositories
        #[arg(long, env = "BURROW_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Force-remove a container
    Rm {
        /// Container ID
        id: String,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays parseable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = GlobalConfig::load().context("Failed to load configuration")?;
    if let Some(engine) = cli.engine {
        config.engine.kind = engine;
    }

    // Config doesn't need an engine
    if let Commands::Config = cli.command {
        return commands::config(&config);
    }

    let manager = burrow_core::ContainerManager::from_config(config)?;

    match cli.command {
        Commands::List { json } => commands::list(&manager, json).await?,
        Commands::Create { repo, token, json } => {
            commands::create(&manager, repo, token, json).await?
        }
        Commands::Rm { id } => commands::remove(&manager, &id).await?,
        Commands::Config => unreachable!(), // Handled above
    }

    Ok(())
}
