//! Stable `sessionId` shared across tabs of a customer, and the fresh
//! `tabId` each tab gets on load.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tab's identity, assigned fresh on every load. Leader election picks the
/// lexicographically smallest `TabId` among foreground candidates (spec
/// §4.2), so ordering is load-bearing, not incidental.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub String);

impl TabId {
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local, per-tab persistence of `sessionId` with a 24 h idle expiry. Kept
/// behind a trait so the 24 h rule is testable without `localStorage`; the
/// `wasm` feature provides a `web_sys::Storage`-backed implementation.
pub trait SessionIdStore: Send + Sync {
    fn read(&self) -> Option<(SessionId, u64)>;
    fn write(&self, session_id: &SessionId, last_seen_ms: u64);
}

pub const SESSION_IDLE_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Returns the session id to use this load: the persisted one if it's
/// within the 24 h idle window, otherwise a fresh one. Always re-stamps the
/// idle timestamp — writes are idempotent and last-write-wins across tabs
/// opening concurrently (spec §5).
pub fn resolve_session_id(store: &dyn SessionIdStore, now_ms: u64) -> SessionId {
    let session_id = match store.read() {
        Some((id, last_seen_ms)) if now_ms.saturating_sub(last_seen_ms) < SESSION_IDLE_WINDOW_MS => id,
        _ => SessionId::fresh(),
    };
    store.write(&session_id, now_ms);
    session_id
}
