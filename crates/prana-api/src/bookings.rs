//! Handlers for the booking lifecycle.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/bookings` | Clients book themselves; admins book anyone |
//! | `GET`  | `/bookings/{id}` | Owner or admin |
//! | `POST` | `/bookings/{id}/cancel` | Owner or admin; `override_window` is staff-only |
//! | `PUT`  | `/bookings/{id}/status` | Admin attendance override |
//! | `GET`  | `/sessions/{id}/bookings` | Admin roster view |
//!
//! Capacity, duplicate, and visit-balance enforcement happen inside the
//! store transaction; this layer only decides who the booking is for and
//! which [`Actor`] the cancellation policy sees.

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use prana_core::{
  booking::{Booking, BookingReceipt, BookingStatus},
  policy::Actor,
  profile::Identity,
  store::StudioStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiError, require_access, require_admin};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub session_id: Uuid,
  /// Defaults to the caller. Only admins may book for someone else.
  pub client_id:  Option<Uuid>,
}

/// `POST /bookings`
pub async fn create<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let client_id = body.client_id.unwrap_or(identity.profile_id);
  require_access(&identity, client_id)?;

  let receipt: BookingReceipt = store
    .book_session(body.session_id, client_id, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(receipt)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /bookings/{id}`
pub async fn get_one<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
  let booking = store
    .get_booking(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("booking {id} not found")))?;
  require_access(&identity, booking.client_id)?;
  Ok(Json(booking))
}

// ─── Cancel ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
  /// Ignored for client identities: only staff can cancel inside the window.
  #[serde(default)]
  pub override_window: bool,
}

/// `POST /bookings/{id}/cancel`
pub async fn cancel<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
  body: Option<Json<CancelBody>>,
) -> Result<Json<Booking>, ApiError> {
  let booking = store
    .get_booking(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("booking {id} not found")))?;
  require_access(&identity, booking.client_id)?;

  let actor = if identity.is_admin() {
    let override_window = body.map(|Json(b)| b.override_window).unwrap_or(false);
    Actor::Staff { override_window }
  } else {
    Actor::Client
  };

  let cancelled = store
    .cancel_booking(id, actor, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(cancelled))
}

// ─── Attendance ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: BookingStatus,
}

/// `PUT /bookings/{id}/status` — staff attendance marking. Moving into
/// `cancelled` through this route bypasses the window.
pub async fn set_status<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Booking>, ApiError> {
  require_admin(&identity)?;
  let booking = store
    .set_booking_status(id, body.status, Actor::Staff { override_window: true }, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(booking))
}

// ─── Roster ───────────────────────────────────────────────────────────────────

/// `GET /sessions/{id}/bookings`
pub async fn for_session<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, ApiError> {
  require_admin(&identity)?;
  let bookings = store.list_session_bookings(id).await.map_err(ApiError::store)?;
  Ok(Json(bookings))
}
