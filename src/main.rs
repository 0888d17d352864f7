//! # vdb-sync CLI (`vdbsync`)
//!
//! Inspect and clean up vector-database collections against the knowledge
//! bases registered in the training console.
//!
//! ## Usage
//!
//! ```bash
//! vdbsync --config ./config/vdbsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vdbsync providers` | List configured vector database providers |
//! | `vdbsync use <id>` | Make a provider the backend default |
//! | `vdbsync collections` | List the provider's collections |
//! | `vdbsync sync` | Classify collections as synced, missing or orphaned |
//! | `vdbsync delete <name>` | Delete one collection and re-sync |
//! | `vdbsync cleanup` | Delete all orphan collections |
//! | `vdbsync test` | Verify the provider connection |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vdb_sync::commands::{self, OutputFormat};
use vdb_sync::config::{self, CleanupMode, Config};
use vdb_sync::progress::ProgressMode;

#[derive(Parser)]
#[command(
    name = "vdbsync",
    about = "Reconcile vector-database collections against registered knowledge bases",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/vdbsync.toml`. When the file does not exist,
    /// built-in defaults are used (backend at `http://localhost:8000/api`).
    #[arg(long, global = true, default_value = "./config/vdbsync.toml")]
    config: PathBuf,

    /// Override `api.base_url` from the config file.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Output format for command results.
    #[arg(long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured vector database providers.
    Providers,

    /// Make a provider the backend default.
    Use {
        /// Provider id.
        provider_id: i64,
    },

    /// List the collections held by a provider.
    Collections {
        /// Provider id. Defaults to `sync.default_provider`, then the backend default.
        #[arg(long)]
        provider: Option<i64>,
    },

    /// Classify collections against knowledge bases.
    ///
    /// Fetches both lists and reports synced pairs, missing collections
    /// (registered locally, absent remotely) and orphans (remote only).
    Sync {
        #[arg(long)]
        provider: Option<i64>,

        /// Show the backend's own reconciliation instead of computing it here.
        #[arg(long)]
        server: bool,
    },

    /// Delete one collection, then re-sync.
    Delete {
        /// Collection name.
        name: String,

        #[arg(long)]
        provider: Option<i64>,
    },

    /// Delete every orphan collection.
    ///
    /// Re-syncs first so only currently orphaned collections are deleted.
    /// A failed delete is reported and does not stop the rest.
    Cleanup {
        #[arg(long)]
        provider: Option<i64>,

        /// Where the deletes run: `client` (one call per orphan) or `server`.
        #[arg(long, value_parser = parse_cleanup_mode)]
        mode: Option<CleanupMode>,

        /// List the orphans without deleting anything.
        #[arg(long)]
        dry_run: bool,

        /// Progress on stderr. `auto` shows human progress on a terminal.
        #[arg(long, value_enum, default_value = "auto")]
        progress: ProgressArg,
    },

    /// Test the connection to a provider.
    Test {
        #[arg(long)]
        provider: Option<i64>,
    },
}

fn parse_cleanup_mode(s: &str) -> Result<CleanupMode, String> {
    match s {
        "client" => Ok(CleanupMode::Client),
        "server" => Ok(CleanupMode::Server),
        other => Err(format!("invalid cleanup mode '{}': expected client or server", other)),
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ProgressArg {
    Auto,
    Human,
    Json,
    Off,
}

impl ProgressArg {
    fn resolve(self) -> ProgressMode {
        match self {
            ProgressArg::Auto => ProgressMode::detect(),
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
            ProgressArg::Off => ProgressMode::Off,
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        Config::minimal()
    };
    if let Some(url) = &cli.api_url {
        cfg.api.base_url = url.clone();
        config::validate(&cfg)?;
    }
    Ok(cfg)
}

fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("vdb_sync={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load(&cli)?;
    init_logging(cli.verbose, &cfg.logging.level);

    let output = cli.output;
    match cli.command {
        Commands::Providers => {
            commands::run_providers(&cfg, output).await?;
        }
        Commands::Use { provider_id } => {
            commands::run_use(&cfg, provider_id).await?;
        }
        Commands::Collections { provider } => {
            commands::run_collections(&cfg, provider, output).await?;
        }
        Commands::Sync { provider, server } => {
            commands::run_sync(&cfg, provider, server, output).await?;
        }
        Commands::Delete { name, provider } => {
            commands::run_delete(&cfg, provider, &name, output).await?;
        }
        Commands::Cleanup {
            provider,
            mode,
            dry_run,
            progress,
        } => {
            commands::run_cleanup(&cfg, provider, mode, dry_run, progress.resolve(), output)
                .await?;
        }
        Commands::Test { provider } => {
            commands::run_test(&cfg, provider, output).await?;
        }
    }

    Ok(())
}
