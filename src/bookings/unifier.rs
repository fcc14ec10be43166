use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::bookings::unified::UnifiedBooking;
use crate::models::{MeetingRequestRow, ServiceRequestRow};
use crate::store::{fetch_rows, SelectQuery, StoreError, TableStore};

#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("Booking source fetch failed: {0}")]
    Source(#[from] StoreError),
}

/// Ordering column shared by both booking source tables.
const CREATED_AT: &str = "created_at";

/// Read-side aggregator over the two booking request tables.
///
/// Downstream consumers see one chronologically ordered collection and
/// never special-case the two source schemas. If either source fetch fails
/// the whole call fails; there is no partial result.
pub struct BookingUnifier {
    store: Arc<dyn TableStore>,
}

impl BookingUnifier {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Fetch both sources concurrently, normalize, merge, and order newest
    /// first.
    pub async fn fetch_all(&self) -> Result<Vec<UnifiedBooking>, UnifyError> {
        let query = SelectQuery::newest_first(CREATED_AT);

        let (meetings, services) = tokio::try_join!(
            fetch_rows::<MeetingRequestRow>(self.store.as_ref(), &query),
            fetch_rows::<ServiceRequestRow>(self.store.as_ref(), &query),
        )?;
        debug!(
            meetings = meetings.len(),
            services = services.len(),
            "unifying booking sources"
        );

        let mut merged: Vec<UnifiedBooking> = meetings
            .into_iter()
            .map(UnifiedBooking::from_meeting_request)
            .chain(services.into_iter().map(UnifiedBooking::from_service_request))
            .collect();

        // The per-source ordering does not survive concatenation, so the
        // merged list is re-sorted. ISO-8601 strings order lexicographically;
        // the empty-string fallback lands at the oldest end.
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(merged)
    }
}
