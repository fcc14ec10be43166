use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Row shape of the `meeting_requests` table.
///
/// Timestamps stay as raw ISO-8601 strings: rows arrive from a hosted
/// backend that has been seeded by several client apps over time, and a
/// date-only or otherwise odd `created_at` must not drop the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequestRow {
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub protocol_officers: Option<i64>,
    #[serde(default)]
    pub vision: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Row shape of the `vvip_service_requests` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequestRow {
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
