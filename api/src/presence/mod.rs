//! The presence REST surface: payload shapes, the orchestration service,
//! and the handlers that wire them into Axum routes.

pub mod handlers;
pub mod payload;
pub mod service;

pub use service::PresenceService;
