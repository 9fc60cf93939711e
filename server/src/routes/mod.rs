use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, HttpSettings};
use crate::handlers::health_check;
use crate::handlers::scan::{offline_data, scan_history_handler, sync_scans, validate_scan};
use crate::state::AppState;
use crate::store::TicketStore;

pub fn create_routes<S: TicketStore>(state: AppState<S>, http: &HttpSettings) -> Router {
    let scan_routes = Router::new()
        .route("/validate", post(validate_scan::<S>))
        .route("/:event_id/history", get(scan_history_handler::<S>))
        .route("/:event_id/offline-data", get(offline_data::<S>))
        .route("/:event_id/sync", post(sync_scans::<S>));

    Router::new()
        .route("/health", get(health_check))
        .nest("/scan", scan_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(http))
        .layer(create_cors_layer(http))
}
