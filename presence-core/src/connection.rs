//! Hybrid connection selection: spec §4.6.
//!
//! Picks WebSocket-vs-polling transport from the current session mode and
//! visibility, manages reconnect backoff, and debounces JOIN so a flapping
//! connection can't spam the server.

use crate::session_mode::SessionMode;
use crate::visibility::VisibilityState;

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const BASE_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 30_000;
const JOIN_DEBOUNCE_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    WebSocket,
    Polling,
}

/// Picks the transport for the given mode/visibility pair (spec §4.6):
/// `passive_active` always polls (at the slower passive interval, chosen
/// separately by `ttl_refresh_interval_secs`'s caller); `active` uses the
/// socket only while foregrounded, falling back to polling in the
/// background rather than holding a socket open behind a backgrounded tab.
pub fn select_transport(mode: SessionMode, visibility: VisibilityState) -> Option<Transport> {
    match mode {
        SessionMode::Removed => None,
        SessionMode::PassiveActive => Some(Transport::Polling),
        SessionMode::Active => match visibility {
            VisibilityState::Foreground => Some(Transport::WebSocket),
            VisibilityState::Background => Some(Transport::Polling),
        },
    }
}

/// The TTL refresh cadence the caller should poll/beat at for the current
/// mode, matching the server's own per-mode TTL policy so a healthy client
/// always refreshes comfortably inside its record's TTL.
pub fn ttl_refresh_interval_secs(mode: SessionMode, active_interval_secs: u64, passive_interval_secs: u64) -> Option<u64> {
    match mode {
        SessionMode::Active => Some(active_interval_secs),
        SessionMode::PassiveActive => Some(passive_interval_secs),
        SessionMode::Removed => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    RetryAfterMs(u64),
    GiveUp,
}

/// Exponential backoff with a hard attempt ceiling: `min(1s * 2^n, 30s)`,
/// giving up after five attempts rather than retrying forever against a
/// server that may be down for an extended outage.
pub struct ReconnectPolicy {
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self { attempts: 0 }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn next_attempt(&mut self) -> ReconnectDecision {
        if self.attempts >= MAX_RECONNECT_ATTEMPTS {
            return ReconnectDecision::GiveUp;
        }
        let delay = BASE_BACKOFF_MS.saturating_mul(1u64 << self.attempts).min(MAX_BACKOFF_MS);
        self.attempts += 1;
        ReconnectDecision::RetryAfterMs(delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapses bursts of JOIN triggers (e.g. rapid tab-visibility flapping or
/// several tabs starting up within the same second) into at most one JOIN
/// per second.
pub struct JoinDebouncer {
    last_sent_ms: Option<u64>,
}

impl JoinDebouncer {
    pub fn new() -> Self {
        Self { last_sent_ms: None }
    }

    /// Returns `true` if a JOIN may be sent now, recording that it was.
    pub fn try_send(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_sent_ms {
            if now_ms.saturating_sub(last) < JOIN_DEBOUNCE_MS {
                return false;
            }
        }
        self.last_sent_ms = Some(now_ms);
        true
    }
}

impl Default for JoinDebouncer {
    fn default() -> Self {
        Self::new()
    }
}
