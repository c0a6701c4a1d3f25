//! Error taxonomy for `prana-core`.
//!
//! Domain failures are distinct variants so that the API layer can map each
//! one to a meaningful status code instead of a blanket 500.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  // ── Booking lifecycle ─────────────────────────────────────────────────
  #[error("session {0} is full")]
  SessionFull(Uuid),

  #[error("client {client_id} already has a booking for session {session_id}")]
  DuplicateBooking { session_id: Uuid, client_id: Uuid },

  #[error("client {0} has no active subscription")]
  NoActiveSubscription(Uuid),

  #[error(
    "cancellation blocked: {minutes_left} minutes until start is inside the \
     {window_minutes}-minute window"
  )]
  CancellationWindowViolation {
    minutes_left:   i64,
    window_minutes: i64,
  },

  #[error("booking {0} is already cancelled")]
  AlreadyCancelled(Uuid),

  /// The guarded visit decrement found no remaining visits. Should not be
  /// reachable when the subscription was selected in the same transaction.
  #[error("subscription {0} has no visits remaining")]
  VisitsExhausted(Uuid),

  // ── Lookups ───────────────────────────────────────────────────────────
  #[error("booking not found: {0}")]
  BookingNotFound(Uuid),

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("client not found: {0}")]
  ClientNotFound(Uuid),

  #[error("subscription not found: {0}")]
  SubscriptionNotFound(Uuid),

  #[error("plan not found: {0}")]
  PlanNotFound(Uuid),

  // ── Boundary validation ───────────────────────────────────────────────
  #[error("validation failure: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Store-level failure (I/O, corruption, pool exhaustion).
  #[error("backend unavailable: {0}")]
  Backend(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
