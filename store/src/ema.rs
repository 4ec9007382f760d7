//! Exponential moving average engine: §4.10 of the spec.

use crate::error::StoreResult;
use crate::presence_store::PresenceStore;
use serde::Serialize;

/// `emaₖ = α·cₖ + (1−α)·emaₖ₋₁`, with `ema₁ = c₁` on the first sample.
///
/// Pure so the EMA law (spec §8) can be tested as a closed-form sequence
/// without touching Redis.
pub fn next_ema(alpha: f64, previous: Option<f64>, count: u64) -> f64 {
    debug_assert!(alpha > 0.0 && alpha < 1.0, "alpha must be in (0, 1)");
    match previous {
        None => count as f64,
        Some(prev) => alpha * (count as f64) + (1.0 - alpha) * prev,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSample {
    pub customer_id: String,
    pub timestamp: String,
    pub count: u64,
    pub ema: f64,
}

/// One tick of the EMA engine for a single customer: read the active count,
/// read the previous EMA, compute and persist the new one, and return the
/// sample so the caller (the WebSocket fleet) can broadcast it.
///
/// `alpha` is per-customer tunable per spec §4.10; callers typically pass the
/// process-wide default from config.
pub async fn tick(store: &PresenceStore, customer_id: &str, alpha: f64) -> StoreResult<MetricsSample> {
    let count = store.get_active_count(customer_id).await?;
    let previous = store.get_ema(customer_id).await?;
    let ema = next_ema(alpha, previous, count);
    store.set_ema(customer_id, ema).await?;

    Ok(MetricsSample {
        customer_id: customer_id.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        count,
        ema,
    })
}
