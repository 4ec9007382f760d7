//! Presence service: spec.md §4.8. Orchestrates the lower-level
//! `store::PresenceStore` operations into JOIN / LEAVE / TTL-refresh /
//! disconnect cleanup, the way the teacher splits `services/*_service.rs`
//! business rules from `db::repository` data access.

use common::Config;
use store::{DisconnectResolver, PresenceRecord, PresenceStore, SessionMode, StoreResult};

use super::payload::{JoinPayload, LeavePayload};

pub enum LeaveOutcome {
    /// Processed: either an existing record was removed, or a tombstone was
    /// written because none existed.
    Processed,
    /// Absorbed by the `SEEN_LEAVE` idempotency guard.
    DuplicateLeave,
}

#[derive(Clone)]
pub struct PresenceService {
    store: PresenceStore,
    disconnect: DisconnectResolver,
    config: &'static Config,
}

impl PresenceService {
    pub fn new(store: PresenceStore, disconnect: DisconnectResolver, config: &'static Config) -> Self {
        Self { store, disconnect, config }
    }

    pub fn disconnect_resolver(&self) -> &DisconnectResolver {
        &self.disconnect
    }

    pub fn store(&self) -> &PresenceStore {
        &self.store
    }

    /// JOIN: "merge with existing record (preserve device/tab-count fields
    /// if the incoming payload omits them)...cancel any pending disconnect
    /// timer...write via set".
    pub async fn join(&self, payload: JoinPayload) -> StoreResult<PresenceRecord> {
        self.disconnect.cancel(&payload.customer_id, &payload.session_id).await;

        let patch = store::PresenceRecordPatch {
            customer_id: payload.customer_id.clone(),
            session_id: payload.session_id.clone(),
            tab_id: Some(payload.tab_id.clone()),
            platform: payload.platform.clone(),
            browser: payload.browser.clone(),
            device: payload.device.clone(),
            desktop_mode: payload.desktop_mode,
            total_tab_quantity: payload.total_tab_quantity,
            total_background_tab_quantity: payload.total_background_tab_quantity,
            session_mode: payload.session_mode,
        };

        let existing = self.store.get(&payload.customer_id, &payload.session_id).await?;
        let record = match existing {
            Some(mut stored) => {
                patch.apply_onto(&mut stored);
                stored
            }
            None => patch.into_fresh_record(),
        };

        self.store.set(record).await
    }

    /// BEAT (legacy, §4.8): retained only for clients predating TTL refresh.
    /// If a record exists, `update` it (keeping its remaining TTL); otherwise
    /// create one with the default TTL for its mode.
    pub async fn beat(&self, payload: JoinPayload) -> StoreResult<PresenceRecord> {
        let patch = store::PresenceRecordPatch {
            customer_id: payload.customer_id.clone(),
            session_id: payload.session_id.clone(),
            tab_id: Some(payload.tab_id.clone()),
            platform: payload.platform.clone(),
            browser: payload.browser.clone(),
            device: payload.device.clone(),
            desktop_mode: payload.desktop_mode,
            total_tab_quantity: payload.total_tab_quantity,
            total_background_tab_quantity: payload.total_background_tab_quantity,
            session_mode: payload.session_mode,
        };
        self.store.update(patch).await
    }

    /// LEAVE: de-duplicated via `X-Leave-Id`, then remove-or-tombstone.
    pub async fn leave(&self, payload: &LeavePayload, leave_id: Option<&str>) -> StoreResult<LeaveOutcome> {
        if let Some(id) = leave_id {
            let first_seen = self.store.mark_seen_leave(id, self.config.seen_leave_ttl_secs).await?;
            if !first_seen {
                return Ok(LeaveOutcome::DuplicateLeave);
            }
        }

        match self.store.get(&payload.customer_id, &payload.session_id).await? {
            Some(_) => {
                self.store.remove(&payload.customer_id, &payload.session_id).await?;
            }
            None => {
                self.store
                    .write_leave_tombstone(
                        &payload.customer_id,
                        &payload.session_id,
                        &payload.tab_id,
                        self.config.leave_tombstone_ttl_secs,
                    )
                    .await?;
            }
        }

        Ok(LeaveOutcome::Processed)
    }

    /// TTL refresh (§4.8/§4.9): "if the payload carries a new session_mode,
    /// persist it first; then extend TTL to mode's value".
    pub async fn refresh_ttl(
        &self,
        customer_id: &str,
        session_id: &str,
        mode: Option<SessionMode>,
    ) -> StoreResult<Option<u64>> {
        self.store.refresh_ttl(customer_id, session_id, mode).await
    }

    /// Disconnect cleanup (§4.8/§5): desktop records rely on TTL alone;
    /// mobile/tablet records get the aggressive two-stage resolver.
    pub async fn handle_disconnect(&self, record: &PresenceRecord) {
        if !record.is_mobile_like() {
            return;
        }
        self.disconnect
            .schedule(
                self.store.clone(),
                record.customer_id.clone(),
                record.session_id.clone(),
                self.config.disconnect_grace_ms,
                self.config.disconnect_verify_delay_secs,
                self.config.disconnect_ttl_floor_secs,
            )
            .await;
    }
}
