//! Redis-backed presence store: §4.7 of the spec.
//!
//! Built directly against `redis::aio::ConnectionManager`, which auto
//! reconnects and is cheap to clone — the same "hand out a clone, never
//! share a raw connection" shape the teacher uses for its SeaORM
//! `DatabaseConnection` in `util::state::AppState`.

use std::collections::BTreeSet;

use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::{StoreError, StoreResult};
use crate::keys;
use crate::record::{PresenceRecord, SessionMode};

#[derive(Clone)]
pub struct TtlPolicy {
    pub active_secs: u64,
    pub passive_secs: u64,
    pub clamp_secs: u64,
}

impl TtlPolicy {
    pub fn ttl_for(&self, mode: SessionMode) -> u64 {
        mode.ttl_secs(self.active_secs, self.passive_secs, self.clamp_secs)
    }
}

#[derive(Clone)]
pub struct PresenceStore {
    conn: ConnectionManager,
    ttl: TtlPolicy,
}

impl PresenceStore {
    pub async fn connect(redis_url: &str, ttl: TtlPolicy) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl })
    }

    pub fn from_connection_manager(conn: ConnectionManager, ttl: TtlPolicy) -> Self {
        Self { conn, ttl }
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// `set(record)` — full write, TTL reset to `modeTTL(session_mode)`.
    pub async fn set(&self, mut record: PresenceRecord) -> StoreResult<PresenceRecord> {
        let mut conn = self.conn();
        let now = Utc::now().to_rfc3339();
        record.updated_at = now.clone();
        record.last_activity = "just now".to_string();
        if record.created_at.is_empty() {
            record.created_at = now;
        }

        let key = keys::presence_key(&record.customer_id, &record.session_id);
        let json = serde_json::to_string(&record)?;
        let ttl = self.ttl.ttl_for(record.session_mode);
        let _: () = conn.set_ex(&key, json, ttl).await?;
        Ok(record)
    }

    /// `update(record)` — merge over the stored record, preserving
    /// `createdAt` and the remaining TTL; creates a fresh record (full
    /// `set`) if the key is missing, per the spec's error taxonomy for
    /// "missing record on TTL refresh / BEAT".
    pub async fn update(&self, patch: PresenceRecordPatch) -> StoreResult<PresenceRecord> {
        let mut conn = self.conn();
        let key = keys::presence_key(&patch.customer_id, &patch.session_id);

        let existing: Option<String> = conn.get(&key).await?;
        let mut merged = match existing {
            Some(raw) => {
                let mut stored: PresenceRecord = serde_json::from_str(&raw)?;
                patch.apply_onto(&mut stored);
                stored
            }
            None => {
                tracing::warn!(
                    customer = %patch.customer_id,
                    session = %patch.session_id,
                    "update() on missing record, creating fresh"
                );
                let mut fresh = patch.into_fresh_record();
                fresh.created_at = Utc::now().to_rfc3339();
                fresh
            }
        };

        merged.updated_at = Utc::now().to_rfc3339();
        merged.last_activity = "just now".to_string();
        let json = serde_json::to_string(&merged)?;

        // KEEPTTL preserves whatever TTL the key already had; a brand new
        // key has none yet, so we still need to stamp one in that branch.
        if conn.exists::<_, bool>(&key).await? {
            let _: () = redis::cmd("SET")
                .arg(&key)
                .arg(&json)
                .arg("KEEPTTL")
                .query_async(&mut conn)
                .await?;
        } else {
            let ttl = self.ttl.ttl_for(merged.session_mode);
            let _: () = conn.set_ex(&key, json, ttl).await?;
        }

        Ok(merged)
    }

    /// `refreshTTL(customer, session, mode?)`.
    ///
    /// If `mode` is given and differs from the stored mode, persists the new
    /// mode and refreshes TTL to its value; otherwise extends TTL to the
    /// stored mode's value. No-ops (with a warning) if the key is missing.
    pub async fn refresh_ttl(
        &self,
        customer_id: &str,
        session_id: &str,
        mode: Option<SessionMode>,
    ) -> StoreResult<Option<u64>> {
        let mut conn = self.conn();
        let key = keys::presence_key(customer_id, session_id);

        let existing: Option<String> = conn.get(&key).await?;
        let Some(raw) = existing else {
            tracing::warn!(customer = %customer_id, session = %session_id, "refresh_ttl on missing record");
            return Ok(None);
        };

        let mut record: PresenceRecord = serde_json::from_str(&raw)?;
        let mode_changed = mode.is_some_and(|m| m != record.session_mode);
        if let Some(m) = mode {
            record.session_mode = m;
        }
        let ttl = self.ttl.ttl_for(record.session_mode);

        if mode_changed {
            record.updated_at = Utc::now().to_rfc3339();
            let json = serde_json::to_string(&record)?;
            let _: () = conn.set_ex(&key, json, ttl).await?;
        } else {
            let _: () = conn.expire(&key, ttl as i64).await?;
        }

        Ok(Some(ttl))
    }

    /// `remove(customer, session)` — delete the key. A no-op if absent.
    pub async fn remove(&self, customer_id: &str, session_id: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let key = keys::presence_key(customer_id, session_id);
        let _: () = conn.del(&key).await?;
        Ok(())
    }

    pub async fn get(
        &self,
        customer_id: &str,
        session_id: &str,
    ) -> StoreResult<Option<PresenceRecord>> {
        let mut conn = self.conn();
        let key = keys::presence_key(customer_id, session_id);
        let raw: Option<String> = conn.get(&key).await?;
        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    /// `getActiveSessions(customer)` — cursor-based (non-blocking) scan,
    /// returned deduplicated.
    pub async fn get_active_sessions(&self, customer_id: &str) -> StoreResult<BTreeSet<String>> {
        let mut conn = self.conn();
        let pattern = keys::presence_scan_pattern(customer_id);
        let mut sessions = BTreeSet::new();

        let mut cursor = 0u64;
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;

            for key in batch {
                if let Some(session_id) = keys::session_id_from_key(customer_id, &key) {
                    sessions.insert(session_id);
                }
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        Ok(sessions)
    }

    /// `getActiveCount(customer)` — size of the unique-session set.
    pub async fn get_active_count(&self, customer_id: &str) -> StoreResult<u64> {
        Ok(self.get_active_sessions(customer_id).await?.len() as u64)
    }

    /// `getKeyTTL(customer, session)` — remaining TTL in seconds
    /// (`-1` no TTL, `-2` absent).
    pub async fn get_key_ttl(&self, customer_id: &str, session_id: &str) -> StoreResult<i64> {
        let mut conn = self.conn();
        let key = keys::presence_key(customer_id, session_id);
        let ttl: i64 = conn.ttl(&key).await?;
        Ok(ttl)
    }

    pub async fn set_ema(&self, customer_id: &str, ema: f64) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.set(keys::ema_key(customer_id), ema.to_string()).await?;
        Ok(())
    }

    pub async fn get_ema(&self, customer_id: &str) -> StoreResult<Option<f64>> {
        let mut conn = self.conn();
        let raw: Option<String> = conn.get(keys::ema_key(customer_id)).await?;
        Ok(raw.and_then(|s| s.parse::<f64>().ok()))
    }

    pub async fn publish_metrics(&self, customer_id: &str, payload: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.publish(keys::metrics_channel(customer_id), payload).await?;
        Ok(())
    }

    /// Marks `leave_id` as seen for `seen_leave_ttl_secs`. Returns `true` if
    /// this is the first time it's been seen (the caller should process the
    /// LEAVE), `false` if it's a duplicate that should be absorbed.
    pub async fn mark_seen_leave(&self, leave_id: &str, ttl_secs: u64) -> StoreResult<bool> {
        let mut conn = self.conn();
        let key = keys::seen_leave_key(leave_id);
        let set: bool = redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map(|v| v.is_some())?;
        Ok(set)
    }

    /// Writes a short-lived tombstone so a late JOIN within the grace window
    /// can optionally be rejected.
    pub async fn write_leave_tombstone(
        &self,
        customer_id: &str,
        session_id: &str,
        tab_id: &str,
        ttl_secs: u64,
    ) -> StoreResult<()> {
        let mut conn = self.conn();
        let key = keys::leave_tombstone_key(customer_id, session_id, tab_id);
        let _: () = conn.set_ex(key, Utc::now().to_rfc3339(), ttl_secs).await?;
        Ok(())
    }

    pub async fn has_leave_tombstone(
        &self,
        customer_id: &str,
        session_id: &str,
        tab_id: &str,
    ) -> StoreResult<bool> {
        let mut conn = self.conn();
        let key = keys::leave_tombstone_key(customer_id, session_id, tab_id);
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }
}

/// A partial write used by `update()`/JOIN/BEAT. Mirrors the spec's
/// "preserve device/tab-count fields if the incoming payload omits them"
/// rule for polling-mode TTL refreshes: any `None` field here leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct PresenceRecordPatch {
    pub customer_id: String,
    pub session_id: String,
    pub tab_id: Option<String>,
    pub platform: Option<String>,
    pub browser: Option<String>,
    pub device: Option<String>,
    pub desktop_mode: Option<bool>,
    pub total_tab_quantity: Option<u32>,
    pub total_background_tab_quantity: Option<u32>,
    pub session_mode: Option<SessionMode>,
}

impl PresenceRecordPatch {
    /// Applies the patch's `Some` fields onto an existing record, leaving
    /// omitted fields untouched. Exposed (not just used internally by
    /// `update()`) so `api::presence::PresenceService::join` can run the same
    /// merge-then-`set` semantics the spec's JOIN operation calls for.
    pub fn apply_onto(&self, stored: &mut PresenceRecord) {
        if let Some(ref tab_id) = self.tab_id {
            stored.tab_id = tab_id.clone();
        }
        if self.platform.is_some() {
            stored.platform = self.platform.clone();
        }
        if self.browser.is_some() {
            stored.browser = self.browser.clone();
        }
        if self.device.is_some() {
            stored.device = self.device.clone();
        }
        if let Some(d) = self.desktop_mode {
            stored.desktop_mode = d;
        }
        if let Some(t) = self.total_tab_quantity {
            stored.total_tab_quantity = t;
        }
        if let Some(b) = self.total_background_tab_quantity {
            stored.total_background_tab_quantity = b;
        }
        if let Some(m) = self.session_mode {
            stored.session_mode = m;
        }
    }

    pub fn into_fresh_record(self) -> PresenceRecord {
        PresenceRecord {
            customer_id: self.customer_id,
            session_id: self.session_id,
            tab_id: self.tab_id.unwrap_or_default(),
            is_leader: true,
            platform: self.platform,
            browser: self.browser,
            device: self.device,
            desktop_mode: self.desktop_mode.unwrap_or(true),
            total_tab_quantity: self.total_tab_quantity.unwrap_or(1),
            total_background_tab_quantity: self.total_background_tab_quantity.unwrap_or(0),
            session_mode: self.session_mode.unwrap_or(SessionMode::Active),
            created_at: String::new(),
            updated_at: String::new(),
            last_activity: String::new(),
        }
    }
}
