//! Plugin Crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use plugin_crawler::{
    error::Result,
    models::{Config, DateWindow, StorageBackend},
    pipeline,
    storage::open_store,
    utils::http,
};

/// Nessus plugin crawler
#[derive(Parser, Debug)]
#[command(
    name = "plugin-crawler",
    version,
    about = "Crawls Nessus plugin details into a document store"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the configured storage backend
    #[arg(long, value_enum)]
    store: Option<StoreArg>,

    /// Root directory for the local backend
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every plugin listed in the bulk feed
    Full,

    /// Fetch plugins modified after DATE (YYYY-MM-DD) through today
    Since {
        /// Last day already crawled
        date: String,
    },

    /// Validate configuration
    Validate,

    /// Show the configured store and its document count
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StoreArg {
    Mongo,
    Local,
}

impl From<StoreArg> for StorageBackend {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Mongo => StorageBackend::Mongo,
            StoreArg::Local => StorageBackend::Local,
        }
    }
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    init_logging(cli.verbose, &config.logging.level);

    match loaded {
        Ok(_) => log::info!("Loaded configuration from {}", cli.config.display()),
        Err(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
    }

    config.apply_env();
    if let Some(store) = cli.store {
        config.storage.backend = store.into();
    }
    if let Some(dir) = cli.output_dir {
        config.storage.local_dir = dir;
    }

    match cli.command {
        Command::Full => {
            config.validate()?;
            let client = http::create_client(&config.crawler)?;
            let store = open_store(&config.storage).await?;
            log::info!("Storing plugins in {}", store.describe());

            let summary = pipeline::run_full(&config, store.as_ref(), &client).await?;
            summary.log();
        }

        Command::Since { date } => {
            // reject a bad date before connecting to anything
            let today = Local::now().date_naive();
            DateWindow::parse(&date, today)?;
            config.validate()?;

            let client = http::create_client(&config.crawler)?;
            let store = open_store(&config.storage).await?;
            log::info!("Storing plugins in {}", store.describe());

            let summary =
                pipeline::run_incremental(&config, store.as_ref(), &client, &date, today).await?;
            summary.log();
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            log::info!("Feed: {}", config.endpoints.feed_url);
            log::info!("Search: {}", config.endpoints.search_url);
            log::info!("Detail: {}", config.endpoints.detail_url);

            let store = open_store(&config.storage).await?;
            match store.count().await {
                Ok(count) => log::info!("{}: {} plugin(s) stored", store.describe(), count),
                Err(e) => log::warn!("Could not count documents in {}: {}", store.describe(), e),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
