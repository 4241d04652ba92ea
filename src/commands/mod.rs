pub mod analyze;
pub mod classify;
pub mod download;
pub mod serve;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(analyze::index))
        .route("/analyze", post(analyze::analyze_form))
        .route("/status", get(analyze::status))
        .route("/api/analyze", post(analyze::analyze_json))
}

pub fn router(state: AppState) -> Router {
    routes().layer(TraceLayer::new_for_http()).with_state(state)
}
