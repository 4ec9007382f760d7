//! The WebSocket wire protocol: spec.md §6 "WebSocket surface".

use serde::{Deserialize, Serialize};
use store::SessionMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsIn {
    Auth {
        #[serde(rename = "customerId")]
        customer_id: String,
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "tabId")]
        #[allow(dead_code)]
        tab_id: String,
    },
    Ping {
        #[allow(dead_code)]
        timestamp: Option<i64>,
    },
    TtlRefresh {
        #[serde(rename = "customerId")]
        #[allow(dead_code)]
        customer_id: Option<String>,
        #[serde(rename = "sessionId")]
        #[allow(dead_code)]
        session_id: Option<String>,
        #[serde(rename = "tabId")]
        #[allow(dead_code)]
        tab_id: Option<String>,
        #[allow(dead_code)]
        timestamp: Option<i64>,
        session_mode: Option<SessionMode>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsUpdateData {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    pub timestamp: String,
    pub count: u64,
    pub ema: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOut {
    Hello {
        timestamp: String,
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    #[serde(rename = "metrics:update")]
    MetricsUpdate { data: MetricsUpdateData },
    Pong {
        timestamp: String,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<&'static str>,
    },
}
