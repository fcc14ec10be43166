pub mod unified;
pub mod unifier;

pub use unified::{BookingSource, UnifiedBooking, PENDING_STATUS};
pub use unifier::{BookingUnifier, UnifyError};
