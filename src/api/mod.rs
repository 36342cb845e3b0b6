//! REST API.
//!
//! Thin JSON layer over the query core and the services:
//! - `GET /status/`: daily summary
//! - `/requests/...`: replay listing, registration, cancellation, priority
//! - `/archives/{hrd,vmu}/...`: gap listings, details and totals
//! - `/config/...`: configuration variables
//!
//! List endpoints read their criteria from the query string and answer
//! `{"total": n, "data": [...]}`. Errors answer `{"err": "..."}`.

mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::interfaces::Store;
use crate::query::OrderPolicy;
use crate::services::{ReplayLifecycle, VariableRegistry};
use crate::utils::bootstrap::shutdown_signal;

/// Upper bound on request bodies.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    replays: ReplayLifecycle<dyn Store>,
    variables: VariableRegistry<dyn Store>,
    policy: OrderPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, policy: OrderPolicy) -> Self {
        Self {
            replays: ReplayLifecycle::new(Arc::clone(&store), policy.clone()),
            variables: VariableRegistry::new(Arc::clone(&store)),
            store,
            policy,
        }
    }
}

/// Start the REST server and run until Ctrl+C.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state, &config.allowed_origins);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "REST API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/status/", get(handlers::summary))
        .route("/stats/items/", get(handlers::item_stats))
        .route("/stats/requests/", get(handlers::request_stats))
        .route(
            "/requests/",
            get(handlers::list_replays).post(handlers::register_replay),
        )
        .route("/requests/status/", get(handlers::list_statuses))
        .route(
            "/requests/:id",
            get(handlers::replay_detail)
                .post(handlers::cancel_replay)
                .put(handlers::update_priority),
        )
        .route("/requests/:id/history", get(handlers::replay_history))
        .route("/archives/hrd/gaps/", get(handlers::list_hrd_gaps))
        .route("/archives/hrd/gaps/:id", get(handlers::hrd_gap_detail))
        .route("/archives/hrd/channels/", get(handlers::list_channels))
        .route("/archives/vmu/gaps/", get(handlers::list_vmu_gaps))
        .route("/archives/vmu/gaps/:id", get(handlers::vmu_gap_detail))
        .route("/archives/vmu/sources/", get(handlers::list_sources))
        .route("/archives/vmu/records/", get(handlers::list_records))
        .route(
            "/config/",
            get(handlers::list_variables).post(handlers::register_variable),
        )
        .route("/config/:id", axum::routing::put(handlers::update_variable))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS layer from the configured origins; `*` allows any origin.
fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}
