use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chatsync_core::config::ChatsyncConfig;
use chatsync_infrastructure::ConfigService;

mod commands;

#[derive(Parser)]
#[command(name = "chatsync")]
#[command(about = "chatsync - local-first chat session storage with remote sync", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the local session and hub documents
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored sessions, most recent first
    List,
    /// Create an empty session
    New {
        /// Title for the new session
        #[arg(long)]
        title: Option<String>,
    },
    /// Write every session as a JSON backup
    Export {
        /// Output file (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace all sessions with the contents of a JSON backup
    Import {
        file: PathBuf,
    },
    /// Log in and merge local and remote data
    Sync {
        #[arg(long)]
        user: String,
        #[arg(long, env = "CHATSYNC_ACCESS_TOKEN")]
        token: String,
    },
    /// Delete all local sessions and hubs
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file if none exists
    Init,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn config_service(path: Option<PathBuf>) -> Result<ConfigService> {
    match path {
        Some(path) => Ok(ConfigService::new(path)),
        None => ConfigService::default_location().context("Failed to locate config file"),
    }
}

fn load_config(service: &ConfigService, data_dir: Option<PathBuf>) -> Result<ChatsyncConfig> {
    let mut config = service
        .get_config()
        .with_context(|| format!("Failed to load {}", service.path().display()))?;
    if data_dir.is_some() {
        config.storage.data_dir = data_dir;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config_service = config_service(cli.config)?;
    tracing::debug!("Using config file {}", config_service.path().display());

    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => commands::config::init(&config_service),
        };
    }

    let config = load_config(&config_service, cli.data_dir)?;
    let service = commands::open_service(&config).await?;

    match cli.command {
        Commands::List => commands::sessions::list(&service).await?,
        Commands::New { title } => commands::sessions::create(&service, title).await?,
        Commands::Export { out } => commands::sessions::export(&service, out).await?,
        Commands::Import { file } => commands::sessions::import(&service, &file).await?,
        Commands::Sync { user, token } => commands::sync::run(&service, user, token).await?,
        Commands::Clear { yes } => commands::sessions::clear(&service, yes).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
