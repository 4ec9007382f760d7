//! Wire payloads for the REST surface, named exactly as laid out in
//! spec.md §6's "REST surface" — including its mixed `camelCase`/
//! `snake_case` field casing, which this keeps verbatim rather than
//! "fixing" since it's the contract a real client sends against.

use serde::Deserialize;
use store::SessionMode;

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "tabId")]
    pub tab_id: String,
    #[allow(dead_code)]
    pub timestamp: Option<i64>,
    pub platform: Option<String>,
    pub browser: Option<String>,
    pub device: Option<String>,
    #[serde(rename = "userAgent")]
    #[allow(dead_code)]
    pub user_agent: Option<String>,
    pub desktop_mode: Option<bool>,
    pub total_tab_quantity: Option<u32>,
    #[serde(rename = "total_backgroundTab_quantity")]
    pub total_background_tab_quantity: Option<u32>,
    pub session_mode: Option<SessionMode>,
}

impl JoinPayload {
    pub fn has_required_fields(&self) -> bool {
        !self.customer_id.is_empty() && !self.session_id.is_empty() && !self.tab_id.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeavePayload {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "tabId")]
    pub tab_id: String,
    #[allow(dead_code)]
    pub mode: Option<LeaveMode>,
    #[allow(dead_code)]
    pub reason: Option<LeaveReason>,
}

impl LeavePayload {
    pub fn has_required_fields(&self) -> bool {
        !self.customer_id.is_empty() && !self.session_id.is_empty() && !self.tab_id.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveMode {
    Final,
    Pending,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    External,
    Tabclose,
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsQuery {
    #[serde(rename = "customerId")]
    pub customer_id: Option<String>,
}
