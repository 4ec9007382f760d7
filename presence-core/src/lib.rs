//! Transport-agnostic browser-tab presence agent.
//!
//! This crate holds every piece of client logic that can be expressed
//! without a JS runtime: tab gossip and leader election, visibility
//! debouncing, the session-mode state machine, unload intent
//! classification, and hybrid transport selection. A `wasm` feature (see
//! `Cargo.toml`) wires these traits to the DOM (`wasm_bindings`); it is
//! additive and optional, so this crate's core logic stays testable with
//! plain `cargo test` on the host regardless of whether that feature is
//! enabled.

pub mod clock;
pub mod connection;
pub mod gossip;
pub mod ids;
pub mod leader;
pub mod session_mode;
pub mod unload;
pub mod visibility;

pub use clock::{Clock, FakeClock, SystemClock};
pub use connection::{JoinDebouncer, ReconnectDecision, ReconnectPolicy, Transport, select_transport, ttl_refresh_interval_secs};
pub use gossip::{GossipBus, GossipInbox, GossipMessage, LocalGossipBus, TabState};
pub use ids::{SESSION_IDLE_WINDOW_MS, SessionId, SessionIdStore, TabId, resolve_session_id};
pub use leader::{LeaderTabManager, TabCounts};
pub use session_mode::{DeviceClass, SessionMode, SessionModeEffect, SessionModeMachine};
pub use unload::{DecisionPoint, LeaveReason, UnloadClassifier, UnloadIntent, UnloadOutcome};
pub use visibility::{VisibilityEvent, VisibilitySignal, VisibilityState, VisibilityTracker};

#[cfg(feature = "wasm")]
pub mod wasm_bindings;
