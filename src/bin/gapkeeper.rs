//! gapkeeper: REST API for telemetry gaps and replay requests
//!
//! ## Configuration
//! - GAPKEEPER_CONFIG: YAML config file (optional, `config.yaml` is read if present)
//! - GAPKEEPER__STORAGE__TYPE: sqlite, postgres, file or memory (default: sqlite)
//! - GAPKEEPER__SERVER__PORT: listen port (default: 8080)
//! - GAPKEEPER_LOG: tracing filter (default: info)
//!
//! The first command-line argument, if any, names an additional config file.

use tracing::{error, info};

use gapkeeper::api::{self, AppState};
use gapkeeper::config::Config;
use gapkeeper::storage::init_storage;
use gapkeeper::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;

    info!(storage = ?config.storage.storage_type, "starting gapkeeper");
    let store = init_storage(&config.storage).await?;

    let state = AppState::new(store, config.query.order_policy());
    api::serve(state, &config.server)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;

    info!("gapkeeper stopped");
    Ok(())
}
