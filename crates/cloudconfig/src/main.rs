//! cloudconfig - Spring Cloud Config Server client
//!
//! Main entry point for the cloudconfig CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod settings;

use commands::{SourceArgs, backends, config, file};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// cloudconfig - read configuration from Spring Cloud Config Servers
#[derive(Parser)]
#[command(name = "cloudconfig")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Settings file to use instead of the user and project files
    #[arg(long, value_name = "PATH", global = true, env = "CLOUDCONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Also write JSON logs to a daily rotating file in this directory
    #[arg(long, value_name = "DIR", global = true, env = "CLOUDCONFIG_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch an application's configuration
    Config(config::ConfigArgs),

    /// Fetch a plain file from the config repository
    File(file::FileArgs),

    /// List the resolved Config Servers, in fallback order
    Backends(backends::BackendsArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing: console on stderr, plus an optional rotating JSON file
    let filter = if cli.verbose {
        "cloudconfig=debug,cloudconfig_client=debug,cloudconfig_oauth=debug,info"
    } else {
        "cloudconfig=info,cloudconfig_client=warn,cloudconfig_oauth=warn,warn"
    };
    let console_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let (file_layer, _guard) = match &cli.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "cloudconfig.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "cloudconfig=trace,cloudconfig_client=trace,cloudconfig_oauth=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    // Settings file sources come first, command-line sources after them
    let loaded = settings::load(cli.config.as_deref(), None, None)?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    for path in &loaded.loaded_from {
        tracing::debug!(path = %path.display(), "Loaded settings");
    }

    let mut options = loaded.settings.options();
    options.extend(cli.sources.options()?);

    let timeout = cli
        .sources
        .timeout
        .map(std::time::Duration::from_secs)
        .or_else(|| loaded.settings.timeout());

    // Create context for commands
    let ctx = commands::Context {
        options,
        timeout,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::File(args) => file::run(args, &ctx).await,
        Commands::Backends(args) => backends::run(args, &ctx).await,
    }
}
