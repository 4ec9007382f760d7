//! Shared integration-test bootstrap: a real `AppState` wired to whatever
//! Redis `REDIS_URL` (or the local default) points at, matching the
//! teacher's pattern of pointing integration tests at a live, disposable
//! backing service rather than mocking it.

use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use store::{DisconnectResolver, PresenceStore, TtlPolicy};
use util::state::AppState;
use util::ws::WebSocketManager;

pub async fn test_state() -> AppState {
    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let ttl = TtlPolicy {
        active_secs: 600,
        passive_secs: 300,
        clamp_secs: 600,
    };
    let store = PresenceStore::connect(&redis_url, ttl)
        .await
        .expect("tests require a reachable Redis at REDIS_URL (default redis://127.0.0.1:6379)");

    AppState::new(store, WebSocketManager::new(), DisconnectResolver::new())
}

/// A customer id unique enough that parallel test runs don't collide on the
/// same presence keys.
pub fn unique_customer_id(prefix: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    format!("{prefix}-{nanos}")
}
