#![allow(dead_code)]

use serde_json::{json, Value};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn meeting_request(id: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "full_name": format!("Guest {id}"),
        "email": format!("{id}@example.com"),
        "phone": "+1 202 555 0100",
        "event_type": "state_dinner",
        "created_at": created_at,
    })
}

pub fn service_request(id: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "full_name": format!("Guest {id}"),
        "email": format!("{id}@example.com"),
        "phone": "+1 202 555 0101",
        "service_type": "airport_protocol",
        "created_at": created_at,
    })
}
