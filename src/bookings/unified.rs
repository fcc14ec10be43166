use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{MeetingRequestRow, ServiceRequestRow};

/// Status assigned to bookings whose source row carries none.
pub const PENDING_STATUS: &str = "pending";

/// Which source table a unified booking came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    MeetingRequest,
    VvipService,
}

/// Common projection of the two booking request tables.
///
/// Purely read-side: a unified booking traces back to exactly one source
/// row and is never written back. `created_at` stays a raw ISO-8601 string
/// and is used only for ordering; an absent value becomes the empty string,
/// which sorts as oldest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedBooking {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: String,
    pub created_at: String,
    pub source: BookingSource,

    // Meeting-request extras
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_officers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,

    // Service-request extras
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Decimal>,
}

impl UnifiedBooking {
    /// Normalize a meeting request row. The single place where that shape
    /// maps onto the unified one.
    pub fn from_meeting_request(row: MeetingRequestRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            event_type: row.event_type,
            event_date: row.event_date,
            location: row.location,
            status: row.status.unwrap_or_else(|| PENDING_STATUS.to_string()),
            created_at: row.created_at.unwrap_or_default(),
            source: BookingSource::MeetingRequest,
            protocol_officers: row.protocol_officers,
            vision: row.vision,
            service_type: None,
            requirements: None,
            estimated_cost: None,
        }
    }

    /// Normalize a VVIP service request row.
    pub fn from_service_request(row: ServiceRequestRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            event_type: row.service_type.clone(),
            event_date: row.event_date,
            location: row.location,
            status: row.status.unwrap_or_else(|| PENDING_STATUS.to_string()),
            created_at: row.created_at.unwrap_or_default(),
            source: BookingSource::VvipService,
            protocol_officers: None,
            vision: None,
            service_type: row.service_type,
            requirements: row.requirements,
            estimated_cost: row.estimated_cost,
        }
    }
}
