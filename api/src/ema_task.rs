//! Background EMA broadcast loop (spec.md §4.10): every
//! `ema_update_interval_secs`, recompute each subscribed customer's moving
//! average and fan it out as a `metrics:update` frame, plus the legacy
//! pub/sub channel for out-of-process listeners.

use std::time::Duration;

use common::Config;
use store::ema;
use util::AppState;

use crate::ws::protocol::{MetricsUpdateData, WsOut};

const TOPIC_PREFIX: &str = "customer:";

pub async fn run(app: AppState, config: &'static Config) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.ema_update_interval_secs));
    loop {
        ticker.tick().await;

        let customers: Vec<String> = app
            .ws()
            .topic_names()
            .await
            .iter()
            .filter_map(|t| t.strip_prefix(TOPIC_PREFIX).map(str::to_string))
            .collect();

        for customer_id in customers {
            match ema::tick(app.store(), &customer_id, config.ema_alpha).await {
                Ok(sample) => {
                    let frame = WsOut::MetricsUpdate {
                        data: MetricsUpdateData {
                            customer_id: sample.customer_id.clone(),
                            timestamp: sample.timestamp.clone(),
                            count: sample.count,
                            ema: sample.ema,
                        },
                    };
                    if let Ok(json) = serde_json::to_string(&frame) {
                        app.ws().broadcast(&format!("{TOPIC_PREFIX}{customer_id}"), json).await;
                    }
                    if let Ok(payload) = serde_json::to_string(&sample) {
                        if let Err(e) = app.store().publish_metrics(&customer_id, &payload).await {
                            tracing::warn!(error = %e, customer = %customer_id, "publish_metrics failed");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, customer = %customer_id, "EMA tick failed");
                }
            }
        }
    }
}
