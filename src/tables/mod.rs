use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of backend tables this crate reads and watches.
///
/// Table access is always routed through this enum rather than raw strings,
/// so an unknown table name is a compile error at call sites and a parse
/// error at the change-feed boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Clients,
    MeetingRequests,
    VvipServiceRequests,
    JobPostings,
    CareerApplications,
    InventoryItems,
    StaffMembers,
    GalleryPhotos,
    EmailNotifications,
}

/// Every known table, in a stable order (used by full-snapshot exports).
pub const ALL_TABLES: &[Table] = &[
    Table::Clients,
    Table::MeetingRequests,
    Table::VvipServiceRequests,
    Table::JobPostings,
    Table::CareerApplications,
    Table::InventoryItems,
    Table::StaffMembers,
    Table::GalleryPhotos,
    Table::EmailNotifications,
];

impl Table {
    /// Backend table name as it appears in SQL and change notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::MeetingRequests => "meeting_requests",
            Table::VvipServiceRequests => "vvip_service_requests",
            Table::JobPostings => "job_postings",
            Table::CareerApplications => "career_applications",
            Table::InventoryItems => "inventory_items",
            Table::StaffMembers => "staff_members",
            Table::GalleryPhotos => "gallery_photos",
            Table::EmailNotifications => "email_notifications",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown table: {0}")]
pub struct UnknownTable(pub String);

impl FromStr for Table {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TABLES
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_table_name() {
        for &table in ALL_TABLES {
            assert_eq!(table.as_str().parse::<Table>().unwrap(), table);
        }
    }

    #[test]
    fn rejects_unknown_table_names() {
        assert!("users; DROP TABLE users".parse::<Table>().is_err());
        assert!("bookings".parse::<Table>().is_err());
        assert!("".parse::<Table>().is_err());
    }

    #[test]
    fn serde_form_matches_backend_name() {
        let v = serde_json::to_value(Table::VvipServiceRequests).unwrap();
        assert_eq!(v, serde_json::json!("vvip_service_requests"));
    }
}
