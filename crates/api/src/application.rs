use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use ledger_watch_domain::config::{ApiConfig, ConfigError, MonitorConfig};
use ledger_watch_domain::services::{init_telemetry, TelemetryConfig, TelemetryError};
use ledger_watch_domain::storage::StorageError;
use ledger_watch_monitor::{build_rpc_source, Monitor, MonitorError};
use ledger_watch_storage::StorageBuilder;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    handlers::{current_block_handler, metrics_handler, subscribe_handler, transactions_handler},
    state::AppState,
};

/// Boots telemetry, storage and the ledger pipeline, then serves HTTP until
/// the server is stopped. The pipeline is cancelled and joined before
/// returning.
pub async fn run() -> Result<(), BootstrapError> {
    // 1. Load config
    // The HTTP surface and the pipeline read separate variable sets.
    let api_config = ApiConfig::load_from_env()?;
    let monitor_config = MonitorConfig::load_from_env()?;

    // 2. Telemetry
    // `API_LOG_FILTER` sets the tracing filter.
    let telemetry = init_telemetry(&TelemetryConfig::from_env("API"))?;

    // 3. Storage
    // SQL when `DATABASE_URL` is set, otherwise the in-memory store.
    let store = StorageBuilder::new()
        .database_url(api_config.database_url())
        .build()
        .await?;

    // 4. Ledger RPC source
    let source = Arc::new(build_rpc_source(&monitor_config)?);
    info!(endpoint = source.endpoint(), "ledger rpc endpoint configured");

    // 5. Pipeline and app state
    // Handlers only see the monitor through its handle.
    let monitor = Monitor::new(monitor_config, source, store);
    let state = AppState::new(monitor.handle(), telemetry);

    // 6. HTTP server
    // The factory closure runs once per actix worker.
    let server = HttpServer::new(move || {
        App::new()
            // shared state
            .app_data(web::Data::new(state.clone()))
            // access log
            .wrap(Logger::default())
            .configure(routes)
    })
    .bind(api_config.api_bind_address())?
    .run();
    info!(bind = api_config.api_bind_address(), "http server listening");

    // 7. Start the pipeline next to the server
    let cancel = CancellationToken::new();
    let pipeline = tokio::spawn(monitor.run(cancel.clone()));

    // Resolves on SIGINT/SIGTERM or a fatal server error.
    let served = server.await;

    // 8. Shutdown
    // A block in progress finishes before the pipeline task returns.
    cancel.cancel();
    if let Err(err) = pipeline.await {
        error!(?err, "ledger pipeline task failed");
    }
    // Server errors surface only after the pipeline has been joined.
    served?;

    Ok(())
}

/// Registers every route. Shared with the route tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    // GET  /api/v1/block                   -> last processed block
    // POST /api/v1/subscribe               -> watch an address
    // GET  /api/v1/transactions/{address}  -> recorded matches
    // GET  /metrics                        -> Prometheus text
    cfg.route("/api/v1/block", web::get().to(current_block_handler))
        .route("/api/v1/subscribe", web::post().to(subscribe_handler))
        .route(
            "/api/v1/transactions/{address}",
            web::get().to(transactions_handler),
        )
        .route("/metrics", web::get().to(metrics_handler));
}

/// Anything that can stop the service before or while it serves.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
