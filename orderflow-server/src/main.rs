//! Orderflow Server
//!
//! Accepts order webhooks and fans each order out to the persistence,
//! inventory and notification consumers.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::runtime::RuntimeConfig;
use config::{ConfigLoader, get_database_url};
use orderflow_core::Pipeline;
use orderflow_core::framework::DatabaseProcessor;
use orderflow_core::mailer::{HttpRelayMailer, LogMailer, Mailer};
use orderflow_core::pipeline::Consumers;
use orderflow_core::processors::{
    AlarmBoard, InventoryConsumer, NotificationConsumer, PersistenceConsumer, WebhookGateway,
};
use orderflow_core::secrets::EnvSecretProvider;
use orderflow_core::store::{InMemoryRecordStore, PgRecordStore, RecordStore};
use server::{build_router, run_server};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Orderflow - order webhook fan-out server
#[derive(Parser, Debug)]
#[command(name = "orderflow-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./orderflow.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Create the record table on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "ORDERFLOW_LOG_JSON", default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.log_json);

    tracing::info!("Starting orderflow-server v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let (store, db_pool) = open_store(&config, args.migrate).await?;

    let mailer: Arc<dyn Mailer> = match &config.mail_relay {
        Some(url) => {
            tracing::info!(relay = %url, "Sending emails through HTTP relay");
            Arc::new(HttpRelayMailer::new(url.clone()))
        }
        None => {
            tracing::warn!("No mail relay configured, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let pipeline = Pipeline::from_config(&config.pipeline).await;
    let consumers = Consumers {
        persistence: Arc::new(PersistenceConsumer::new(store.clone())),
        inventory: Arc::new(InventoryConsumer::new(
            store,
            config.pipeline.inventory_mode,
        )),
        notification: Arc::new(NotificationConsumer::new(
            mailer,
            config.pipeline.notification.clone(),
        )),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let alarms = AlarmBoard::new();
    let mut handles =
        pipeline.spawn_workers(&consumers, &config.pipeline.channels, &shutdown_rx);
    handles.push(pipeline.spawn_monitor(alarms.clone(), &config.pipeline, &shutdown_rx));
    tracing::info!(tasks = handles.len(), "Pipeline workers started");

    let gateway = WebhookGateway::new(
        Arc::new(EnvSecretProvider::new()),
        pipeline.topic.clone(),
        config.pipeline.topic_arn.clone(),
    );
    let router = build_router(AppState::new(gateway, pipeline, alarms));

    tracing::info!("Starting HTTP server on {}", config.listen);
    let result = run_server(router, config.listen).await;

    tracing::info!("Stopping pipeline workers...");
    let _ = shutdown_tx.send(true);
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Pipeline task terminated abnormally");
        }
    }

    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Open the record store the consumers write to.
///
/// Without a table name the store-backed consumers stay unconfigured and
/// their messages end up dead-lettered. Without `DATABASE_URL` an in-process
/// store stands in for Postgres.
async fn open_store(
    config: &RuntimeConfig,
    migrate: bool,
) -> anyhow::Result<(Option<Arc<dyn RecordStore>>, Option<PgPool>)> {
    let Some(table) = config.orders_table.clone() else {
        tracing::warn!("ORDERS_TABLE_NAME not set, persistence and inventory are disabled");
        return Ok((None, None));
    };

    let database_url = match get_database_url() {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                table = %table,
                "DATABASE_URL not set, using in-memory record store"
            );
            let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
            return Ok((Some(store), None));
        }
    };

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    let store = PgRecordStore::new(DatabaseProcessor::new(db_pool.clone()), table);
    if migrate {
        tracing::info!(table = %store.table(), "Creating record table...");
        store.ensure_table().await.map_err(|e| {
            tracing::error!("Failed to create record table: {}", e);
            e
        })?;
        tracing::info!("Record table ready");
    }

    let store: Arc<dyn RecordStore> = Arc::new(store);
    Ok((Some(store), Some(db_pool)))
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
