pub mod export;
pub mod outbox;

pub use export::{ExportError, ExportFormat, ExportService};
pub use outbox::NotificationOutbox;
