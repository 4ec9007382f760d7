//! Application state container shared across Axum route handlers and the
//! WebSocket fleet.
//!
//! Holds the three shared resources every handler needs: the Redis-backed
//! presence store, the per-customer `WebSocketManager`, and the disconnect
//! resolver (so WS close handlers and REST JOIN handlers cancel/schedule the
//! same pending timers). Wrapped in an `Arc` internally (all three fields are
//! already cheap to clone) and passed into handlers via Axum's `State<T>`
//! extractor.

use crate::ws::WebSocketManager;
use store::{DisconnectResolver, PresenceStore};

#[derive(Clone)]
pub struct AppState {
    store: PresenceStore,
    ws: WebSocketManager,
    disconnect: DisconnectResolver,
}

impl AppState {
    pub fn new(store: PresenceStore, ws: WebSocketManager, disconnect: DisconnectResolver) -> Self {
        Self { store, ws, disconnect }
    }

    /// Returns a shared reference to the presence store.
    pub fn store(&self) -> &PresenceStore {
        &self.store
    }

    /// Returns a shared reference to the `WebSocketManager`.
    pub fn ws(&self) -> &WebSocketManager {
        &self.ws
    }

    /// Returns a shared reference to the disconnect resolver.
    pub fn disconnect(&self) -> &DisconnectResolver {
        &self.disconnect
    }

    /// Returns a cloned handle to the presence store.
    ///
    /// Useful for async contexts or spawned tasks (the EMA engine, the
    /// disconnect resolver) that need ownership rather than a borrow.
    pub fn store_clone(&self) -> PresenceStore {
        self.store.clone()
    }

    /// Returns a cloned instance of the `WebSocketManager`.
    pub fn ws_clone(&self) -> WebSocketManager {
        self.ws.clone()
    }

    /// Returns a cloned instance of the disconnect resolver.
    pub fn disconnect_clone(&self) -> DisconnectResolver {
        self.disconnect.clone()
    }
}
