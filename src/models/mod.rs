pub mod booking;
pub mod careers;
pub mod client;
pub mod gallery;
pub mod inventory;
pub mod notification;
pub mod staff;

pub use booking::{MeetingRequestRow, ServiceRequestRow};
pub use careers::{CareerApplicationRow, JobPostingRow};
pub use client::ClientRow;
pub use gallery::GalleryPhotoRow;
pub use inventory::InventoryItemRow;
pub use notification::EmailNotificationRow;
pub use staff::StaffMemberRow;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::tables::Table;

/// Compile-time mapping from a typed row shape to its backend table.
///
/// Lets typed read/write helpers dispatch on the row type alone instead of
/// threading table names through call sites.
pub trait TableRow: Serialize + DeserializeOwned + Send {
    const TABLE: Table;
}

impl TableRow for MeetingRequestRow {
    const TABLE: Table = Table::MeetingRequests;
}

impl TableRow for ServiceRequestRow {
    const TABLE: Table = Table::VvipServiceRequests;
}

impl TableRow for ClientRow {
    const TABLE: Table = Table::Clients;
}

impl TableRow for JobPostingRow {
    const TABLE: Table = Table::JobPostings;
}

impl TableRow for CareerApplicationRow {
    const TABLE: Table = Table::CareerApplications;
}

impl TableRow for InventoryItemRow {
    const TABLE: Table = Table::InventoryItems;
}

impl TableRow for StaffMemberRow {
    const TABLE: Table = Table::StaffMembers;
}

impl TableRow for GalleryPhotoRow {
    const TABLE: Table = Table::GalleryPhotos;
}

impl TableRow for EmailNotificationRow {
    const TABLE: Table = Table::EmailNotifications;
}
