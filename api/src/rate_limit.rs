//! Rate-limit header stamping (spec.md §6): shape only. The actual limiting
//! decision is explicitly out of scope (an external collaborator, per the
//! spec's non-goals) — this just guarantees every response carries the
//! three headers a client-side budget can key off of.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

const WINDOW_LIMIT: &str = "120";
const WINDOW_SECS: &str = "60";

pub async fn stamp_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from_static(WINDOW_LIMIT));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from_static(WINDOW_LIMIT));
    headers.insert("X-RateLimit-Reset", HeaderValue::from_static(WINDOW_SECS));

    response
}
