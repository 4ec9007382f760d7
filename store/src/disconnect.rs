//! The disconnect resolver: §5's two-stage timer, used by the WebSocket
//! fleet when a mobile/tablet socket closes (§4.8, §4.9).
//!
//! Desktop sessions are never scheduled here — TTL alone handles them, per
//! the spec's "Desktop vs mobile disconnect" design note.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::presence_store::PresenceStore;

type Key = (String, String);

#[derive(Clone, Default)]
pub struct DisconnectResolver {
    pending: Arc<Mutex<HashMap<Key, Arc<Notify>>>>,
}

impl DisconnectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the two-stage cleanup for `(customer_id, session_id)`.
    /// Any previously scheduled timer for the same key is superseded (its
    /// `Notify` is woken, which the running task interprets as "a JOIN
    /// arrived, abort").
    pub async fn schedule(
        &self,
        store: PresenceStore,
        customer_id: String,
        session_id: String,
        grace_ms: u64,
        verify_delay_secs: u64,
        ttl_floor_secs: i64,
    ) {
        let key = (customer_id.clone(), session_id.clone());
        let notify = Arc::new(Notify::new());

        {
            let mut pending = self.pending.lock().await;
            if let Some(old) = pending.insert(key.clone(), notify.clone()) {
                old.notify_waiters();
            }
        }

        let pending = self.pending.clone();
        tokio::spawn(async move {
            // Stage 1: short grace window for an immediate tab-duplicate or
            // navigation JOIN.
            tokio::select! {
                _ = notify.notified() => {
                    tracing::debug!(customer = %customer_id, session = %session_id, "disconnect resolver aborted during grace window");
                    return;
                }
                _ = tokio::time::sleep(Duration::from_millis(grace_ms)) => {}
            }

            // Stage 2: wait longer, then inspect the key's remaining TTL.
            tokio::select! {
                _ = notify.notified() => {
                    tracing::debug!(customer = %customer_id, session = %session_id, "disconnect resolver aborted before verify delay");
                    return;
                }
                _ = tokio::time::sleep(Duration::from_secs(verify_delay_secs)) => {}
            }

            let ttl = store.get_key_ttl(&customer_id, &session_id).await;
            match ttl {
                Ok(ttl) if ttl > ttl_floor_secs => {
                    tracing::debug!(
                        customer = %customer_id,
                        session = %session_id,
                        ttl,
                        "disconnect resolver: TTL above floor, a JOIN must have reset it, aborting"
                    );
                }
                Ok(_) => {
                    tracing::info!(customer = %customer_id, session = %session_id, "disconnect resolver: removing stale record");
                    if let Err(e) = store.remove(&customer_id, &session_id).await {
                        tracing::warn!(customer = %customer_id, session = %session_id, error = %e, "disconnect resolver: remove failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(customer = %customer_id, session = %session_id, error = %e, "disconnect resolver: TTL read failed");
                }
            }

            pending.lock().await.remove(&key);
        });
    }

    /// Cancels any pending disconnect timer for this session — called on
    /// JOIN (§4.8) and on WebSocket `auth` (§4.9).
    pub async fn cancel(&self, customer_id: &str, session_id: &str) {
        let key = (customer_id.to_string(), session_id.to_string());
        if let Some(notify) = self.pending.lock().await.remove(&key) {
            notify.notify_waiters();
        }
    }
}
