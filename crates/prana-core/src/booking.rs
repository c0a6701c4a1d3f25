//! Bookings — a client's reservation against a scheduled session.
//!
//! State machine per booking: `booked → {completed, cancelled}`. Cancellation
//! is a soft delete: the row is retained with status `cancelled` so that the
//! attendance history survives and the visit credit-back runs exactly once.
//! Staff attendance overrides flip live bookings between `booked` and
//! `completed` without touching the ledger; `cancelled` is terminal, and
//! putting the client back in the session is a fresh booking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
  Booked,
  Completed,
  Cancelled,
}

impl BookingStatus {
  /// Whether a booking in this status occupies a seat.
  pub fn occupies_seat(&self) -> bool { *self != Self::Cancelled }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
  pub booking_id:      Uuid,
  pub session_id:      Uuid,
  pub client_id:       Uuid,
  /// The subscription debited for this visit, if any.
  pub subscription_id: Option<Uuid>,
  pub status:          BookingStatus,
  pub created_at:      DateTime<Utc>,
}

/// The result of a successful booking: the inserted row plus the subscription
/// it was debited from, with `visits_remaining` already decremented.
#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
  pub booking:      Booking,
  pub subscription: crate::subscription::Subscription,
}
