pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod intelligence; // Health alert analysis engine
pub mod models;
pub mod scheduler;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Serve the API and run the batch scheduler until Ctrl-C.
pub async fn run() -> Result<(), String> {
    init_tracing();
    tracing::info!("Carewatch starting v{}", config::APP_VERSION);

    let config = config::AppConfig::from_env().map_err(|e| e.to_string())?;
    tracing::info!(
        db = %config.db_path.display(),
        addr = %config.bind_addr,
        "Configuration loaded"
    );
    let bind_addr = config.bind_addr;
    let batch_interval = config.batch_interval;
    let state = Arc::new(core_state::CoreState::new(config));

    // Create and migrate before accepting traffic.
    state.open_db().map_err(|e| format!("Cannot open database: {e}"))?;

    let scheduler = batch_interval.map(|interval| scheduler::start_scheduler(state.clone(), interval));
    if scheduler.is_none() {
        tracing::info!("Batch scheduler disabled");
    }

    let mut server = api::start_api_server(state, bind_addr).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");

    server.shutdown();
    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    server.wait().await;
    Ok(())
}
