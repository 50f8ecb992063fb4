use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::workflow::ReceiptService;

/// Build the axum router with all receipt endpoints.
///
/// Unsupported methods on a known path get axum's 405.
pub fn build_router(service: Arc<ReceiptService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route(
            "/receipts",
            post(handler::upload_handler).get(handler::list_handler),
        )
        .route("/receipts/:id", get(handler::receipt_handler))
        .route("/receipts/:id/thumbnails", get(handler::thumbnails_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
