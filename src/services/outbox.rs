use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::bookings::{BookingSource, UnifiedBooking};
use crate::models::EmailNotificationRow;
use crate::store::{insert_row, StoreError, TableStore};

/// Status stamped on freshly queued notification rows.
pub const QUEUED: &str = "queued";

/// Queues booking-lifecycle e-mails as rows in `email_notifications`.
///
/// Glue only: no SMTP and no delivery here. The hosted backend's mailer
/// drains queued rows, and because queuing is an ordinary insert, any
/// dashboard subscribed to the outbox table picks the new row up through
/// the change feed.
pub struct NotificationOutbox {
    store: Arc<dyn TableStore>,
}

impl NotificationOutbox {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Acknowledge a newly submitted booking request.
    pub async fn queue_booking_received(
        &self,
        booking: &UnifiedBooking,
    ) -> Result<EmailNotificationRow, StoreError> {
        let kind = match booking.source {
            BookingSource::MeetingRequest => "meeting request",
            BookingSource::VvipService => "VVIP service request",
        };
        let subject = format!("We have received your {kind}");
        let body = format!(
            "Dear {},\n\nYour {} has been received and is awaiting review.\n\
             Our protocol team will contact you on {}.\n",
            booking.full_name, kind, booking.phone
        );
        self.queue(&booking.email, subject, body).await
    }

    /// Tell the requester their booking moved to a new status.
    pub async fn queue_status_change(
        &self,
        booking: &UnifiedBooking,
        new_status: &str,
    ) -> Result<EmailNotificationRow, StoreError> {
        let subject = format!("Your booking is now {new_status}");
        let body = format!(
            "Dear {},\n\nThe status of your booking{} has changed from {} to {}.\n",
            booking.full_name,
            booking
                .event_date
                .as_deref()
                .map(|d| format!(" for {d}"))
                .unwrap_or_default(),
            booking.status,
            new_status
        );
        self.queue(&booking.email, subject, body).await
    }

    async fn queue(
        &self,
        recipient: &str,
        subject: String,
        body: String,
    ) -> Result<EmailNotificationRow, StoreError> {
        let row = EmailNotificationRow {
            id: Uuid::new_v4().to_string(),
            recipient: recipient.to_string(),
            subject,
            body,
            status: QUEUED.to_string(),
            created_at: Some(Utc::now().to_rfc3339()),
        };
        insert_row(self.store.as_ref(), &row).await?;
        info!(recipient, subject = %row.subject, "queued notification");
        Ok(row)
    }
}
