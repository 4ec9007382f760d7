//! The presence API surface, factored out as a library so integration
//! tests (see `tests/`) can build the same `Router` the binary serves
//! without going through `main`.

pub mod ema_task;
pub mod error;
pub mod presence;
pub mod rate_limit;
pub mod routes;
pub mod ws;
