//! PrintBridge CLI - migrations, imports, stock sync and the task worker.
//!
//! # Usage
//!
//! ```bash
//! # Create or upgrade the sync schema
//! printbridge migrate
//!
//! # Start a full catalog import (first run)
//! printbridge import start --initial
//!
//! # Run the task worker until Ctrl-C
//! printbridge worker
//!
//! # Reconcile stock for every mapped product
//! printbridge stock sync
//!
//! # Inspect mappings
//! printbridge mapping list --status error
//! ```
//!
//! # Environment Variables
//!
//! See [`printbridge_sync::SyncConfig::from_env`]. `RUST_LOG` overrides the
//! default log filter and `LOG_FORMAT=json` switches to JSON logs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use printbridge_sync::SyncConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "printbridge")]
#[command(author, version, about = "Printify to WooCommerce sync tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Control the catalog import
    Import {
        #[command(subcommand)]
        action: ImportAction,
    },
    /// Stock reconciliation
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
    /// Inspect product mappings
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },
    /// Run the task worker until interrupted
    Worker,
}

#[derive(Subcommand)]
enum ImportAction {
    /// Start a full import
    Start {
        /// Restart even if an import is already running
        #[arg(short, long)]
        force: bool,

        /// Mark this run as the initial import
        #[arg(short, long)]
        initial: bool,
    },
    /// Start a catch-up import (skipped while one is running)
    Catchup,
    /// Cancel the running import and its queued tasks
    Cancel,
    /// Show import state and mapping counts
    Stats,
    /// Import a single product now
    Product {
        /// Printify product ID
        id: String,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Reconcile stock for every synced product
    Sync,
}

#[derive(Subcommand)]
enum MappingAction {
    /// List mappings, newest sync first
    List {
        /// Only mappings in this status (`synced`, `pending`, `error`)
        #[arg(short, long)]
        status: Option<SyncStatus>,

        #[arg(short, long, default_value_t = 50)]
        limit: i64,

        #[arg(short, long, default_value_t = 0)]
        offset: i64,
    },
    /// Look up the WooCommerce product for a Printify product
    Local {
        /// Printify product ID
        supplier_id: String,
    },
    /// Look up the Printify product for a WooCommerce product
    Supplier {
        /// WooCommerce product ID
        local_id: i64,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SyncConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "printbridge_sync=info,printbridge=info".into());

    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = SyncConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &SyncConfig) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run(config).await?,
        Commands::Import { action } => match action {
            ImportAction::Start { force, initial } => {
                commands::import::start(config, force, initial).await?;
            }
            ImportAction::Catchup => commands::import::catchup(config).await?,
            ImportAction::Cancel => commands::import::cancel(config).await?,
            ImportAction::Stats => commands::import::stats(config).await?,
            ImportAction::Product { id } => {
                commands::import::product(config, &SupplierProductId::new(id)).await?;
            }
        },
        Commands::Stock { action } => match action {
            StockAction::Sync => commands::stock::sync(config).await?,
        },
        Commands::Mapping { action } => match action {
            MappingAction::List {
                status,
                limit,
                offset,
            } => commands::mapping::list(config, status, limit, offset).await?,
            MappingAction::Local { supplier_id } => {
                commands::mapping::local(config, &SupplierProductId::new(supplier_id)).await?;
            }
            MappingAction::Supplier { local_id } => {
                commands::mapping::supplier(config, ProductId::new(local_id)).await?;
            }
        },
        Commands::Worker => commands::worker::run(config).await?,
    }
    Ok(())
}
