//! REST handlers: spec.md §6's `POST /presence/join`, `POST /presence/leave`,
//! `GET /active-users/metrics`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use common::Config;
use serde_json::json;
use util::AppState;

use crate::error::ApiError;

use super::payload::{JoinPayload, LeavePayload, MetricsQuery};
use super::service::{LeaveOutcome, PresenceService};

fn service(app: &AppState) -> PresenceService {
    PresenceService::new(app.store_clone(), app.disconnect_clone(), Config::get())
}

/// `POST /presence/join` — `200 {success:true}` on accept, `400` if any of
/// customer/session/tab are missing.
pub async fn join(State(app): State<AppState>, Json(payload): Json<JoinPayload>) -> Result<impl IntoResponse, ApiError> {
    if !payload.has_required_fields() {
        return Err(ApiError::MissingFields);
    }

    let record = service(&app).join(payload).await?;
    tracing::debug!(customer = %record.customer_id, session = %record.session_id, mode = ?record.session_mode, "JOIN processed");
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

/// `POST /presence/beat` — legacy heartbeat, retained for pre-TTL-refresh
/// clients only (spec.md §4.8); current clients use TTL refresh instead.
pub async fn beat(State(app): State<AppState>, Json(payload): Json<JoinPayload>) -> Result<impl IntoResponse, ApiError> {
    if !payload.has_required_fields() {
        return Err(ApiError::MissingFields);
    }

    let record = service(&app).beat(payload).await?;
    tracing::debug!(customer = %record.customer_id, session = %record.session_id, "BEAT processed (legacy)");
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

/// `POST /presence/leave` — accepts JSON or beacon-style `text/plain`;
/// always `200` (processed) or `204` (dismissal-safe), never an error
/// status, since this runs during the page's unload race.
pub async fn leave(State(app): State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let leave_id = headers
        .get("X-Leave-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let text = String::from_utf8_lossy(&body);
    let payload: Option<LeavePayload> = serde_json::from_str(&text).ok();

    let Some(payload) = payload.filter(LeavePayload::has_required_fields) else {
        return StatusCode::NO_CONTENT;
    };

    match service(&app).leave(&payload, leave_id.as_deref()).await {
        Ok(LeaveOutcome::Processed) => StatusCode::OK,
        Ok(LeaveOutcome::DuplicateLeave) => StatusCode::NO_CONTENT,
        Err(e) => {
            tracing::warn!(error = %e, "LEAVE failed; responding dismissal-safe anyway");
            StatusCode::NO_CONTENT
        }
    }
}

/// `GET /active-users/metrics?customerId=…` → `{timestamp, count, ema,
/// customerId}`, or `400` missing id.
pub async fn metrics(State(app): State<AppState>, Query(query): Query<MetricsQuery>) -> Result<impl IntoResponse, ApiError> {
    let customer_id = query.customer_id.filter(|c| !c.is_empty()).ok_or(ApiError::MissingCustomerId)?;

    let count = app.store().get_active_count(&customer_id).await?;
    let ema = app.store().get_ema(&customer_id).await?.unwrap_or(count as f64);

    Ok(Json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "count": count,
        "ema": ema,
        "customerId": customer_id,
    })))
}
