//! Redis-backed presence store, EMA engine, idempotency tombstones and the
//! disconnect resolver — the server-side "keyed, TTL'd record per
//! (customer, session)" core described in the spec's §4.7–§4.10.

pub mod disconnect;
pub mod ema;
pub mod error;
pub mod keys;
pub mod presence_store;
pub mod record;

pub use disconnect::DisconnectResolver;
pub use error::{StoreError, StoreResult};
pub use presence_store::{PresenceRecordPatch, PresenceStore, TtlPolicy};
pub use record::{PresenceRecord, SessionMode};
