//! The presence record and the session-mode -> TTL policy.

use serde::{Deserialize, Serialize};

/// `active | passive_active`. `removed` is not a variant here: per the data
/// model, "removed" means the key is simply absent from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Active,
    PassiveActive,
}

impl SessionMode {
    /// `modeTTL(session_mode)` from the spec's Presence Store contract,
    /// clamped to `clamp_secs` (server policy MUST NOT exceed 10 min).
    pub fn ttl_secs(self, active_secs: u64, passive_secs: u64, clamp_secs: u64) -> u64 {
        let raw = match self {
            SessionMode::Active => active_secs,
            SessionMode::PassiveActive => passive_secs,
        };
        raw.min(clamp_secs)
    }
}

/// One record per `(customerId, sessionId)`, written only by that session's
/// leader tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub customer_id: String,
    pub session_id: String,
    pub tab_id: String,
    /// Always `true`: followers never write, so any record in the store
    /// belongs to whichever tab held the leadership at write time.
    pub is_leader: bool,

    pub platform: Option<String>,
    pub browser: Option<String>,
    pub device: Option<String>,
    pub desktop_mode: bool,
    pub total_tab_quantity: u32,
    pub total_background_tab_quantity: u32,

    pub session_mode: SessionMode,

    pub created_at: String,
    pub updated_at: String,
    pub last_activity: String,
}

impl PresenceRecord {
    /// True when `device`/`platform` marks this as a mobile or tablet
    /// session, i.e. the aggressive disconnect resolver (§5) applies rather
    /// than the "desktop relies on TTL" policy.
    pub fn is_mobile_like(&self) -> bool {
        matches!(
            self.device.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("mobile") | Some("tablet")
        )
    }
}
