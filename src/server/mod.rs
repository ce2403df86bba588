pub mod routes;
pub mod ws;

use crate::state::AppState;
use axum::routing::{delete, get, post};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/api/state", get(routes::get_state))
        .route("/api/history", get(routes::get_history))
        .route("/api/counters", get(routes::get_counters))
        .route("/api/step", post(routes::post_step))
        .route("/api/contracts", post(routes::post_contract))
        .route("/api/contracts/{id}", delete(routes::delete_contract))
        .route("/api/reset", post(routes::post_reset))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(
            tower_http::services::ServeDir::new("dashboard/dist")
                .fallback(tower_http::services::ServeFile::new("dashboard/dist/index.html")),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
