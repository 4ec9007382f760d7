use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use util::AppState;

use crate::presence::handlers;
use crate::rate_limit;
use crate::ws::fleet;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/presence/join", post(handlers::join))
        .route("/presence/beat", post(handlers::beat))
        .route("/presence/leave", post(handlers::leave))
        .route("/active-users/metrics", get(handlers::metrics))
        .route("/ws/active-users", get(fleet::upgrade))
        .layer(axum::middleware::from_fn(rate_limit::stamp_headers))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
