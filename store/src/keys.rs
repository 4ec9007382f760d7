//! Redis key layout, exactly as laid out in the spec's "Persisted state
//! layout" table.

pub fn presence_key(customer_id: &str, session_id: &str) -> String {
    format!("presence:{customer_id}:{session_id}")
}

pub fn presence_scan_pattern(customer_id: &str) -> String {
    format!("presence:{customer_id}:*")
}

pub fn ema_key(customer_id: &str) -> String {
    format!("ema:{customer_id}")
}

pub fn metrics_channel(customer_id: &str) -> String {
    format!("metrics:{customer_id}")
}

pub fn seen_leave_key(leave_id: &str) -> String {
    format!("SEEN_LEAVE:{leave_id}")
}

pub fn leave_tombstone_key(customer_id: &str, session_id: &str, tab_id: &str) -> String {
    format!("LEAVE_TOMBSTONE:{}:{tab_id}", presence_key(customer_id, session_id))
}

/// Extracts `sessionId` back out of a `presence:{customerId}:{sessionId}` key.
pub fn session_id_from_key(customer_id: &str, key: &str) -> Option<String> {
    key.strip_prefix(&format!("presence:{customer_id}:"))
        .map(|s| s.to_string())
}
