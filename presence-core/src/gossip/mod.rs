//! The gossip bus: a named same-origin channel scoped to `customer:session`
//! (spec §4.1). Messages are small typed envelopes; senders never see their
//! own echo.

mod local;

pub use local::LocalGossipBus;

use crate::ids::TabId;
use serde::{Deserialize, Serialize};

/// The seven message types of spec §4.1, tagged the way the teacher tags
/// its WebSocket envelopes (`#[serde(tag = "type")]` in `api::ws::types`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GossipMessage {
    WhoIsHere,
    IAmHere { tab_id: TabId, state: TabState },
    TabState { tab_id: TabId, state: TabState },
    TabClosed { tab_id: TabId },
    LeaderElection { tab_id: TabId },
    LeaderCandidate { tab_id: TabId, timestamp_ms: u64 },
    LeaderBeat { tab_id: TabId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabState {
    Foreground,
    Background,
}

/// A single tab's read side of the bus: best-effort, unordered delivery.
pub trait GossipInbox: Send {
    /// Drains one pending message, if any. Never blocks.
    fn try_recv(&mut self) -> Option<GossipMessage>;
}

/// The bus itself: a tab joins with `subscribe`, then publishes with
/// `publish`. Implementations MUST NOT deliver a tab's own messages back to
/// it (the spec's "senders ignore their own echo" rule) — `LocalGossipBus`
/// enforces this structurally by never registering the sender as a
/// recipient of its own `publish` call.
pub trait GossipBus: Send + Sync {
    fn subscribe(&self, tab_id: TabId) -> Box<dyn GossipInbox>;
    fn publish(&self, from: &TabId, msg: GossipMessage);
    fn unsubscribe(&self, tab_id: &TabId);
}
