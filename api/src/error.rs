//! The HTTP-boundary error type: wraps domain failures into the status
//! codes spec.md §4.8/§7 specifies, mirroring the `#[from]`-heavy style
//! `store::StoreError` and `db::achievement_engine::AchievementError` use.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required fields")]
    MissingFields,

    #[error("missing customerId")]
    MissingCustomerId,

    #[error(transparent)]
    Store(#[from] store::StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingFields => (StatusCode::BAD_REQUEST, "Missing required fields"),
            ApiError::MissingCustomerId => (StatusCode::BAD_REQUEST, "Missing customerId"),
            ApiError::Store(e) => {
                tracing::warn!(error = %e, "presence store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
