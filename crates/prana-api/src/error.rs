//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error(transparent)]
  Domain(prana_core::Error),
}

impl ApiError {
  /// Map a store failure into the domain taxonomy.
  pub fn store<E: Into<prana_core::Error>>(e: E) -> Self { ApiError::Domain(e.into()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use prana_core::Error as E;

    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Domain(e) => {
        let status = match e {
          E::SessionFull(_)
          | E::DuplicateBooking { .. }
          | E::AlreadyCancelled(_)
          | E::CancellationWindowViolation { .. } => StatusCode::CONFLICT,
          E::NoActiveSubscription(_) | E::VisitsExhausted(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
          }
          E::BookingNotFound(_)
          | E::SessionNotFound(_)
          | E::ClientNotFound(_)
          | E::SubscriptionNotFound(_)
          | E::PlanNotFound(_) => StatusCode::NOT_FOUND,
          E::Validation(_) => StatusCode::BAD_REQUEST,
          E::Serialization(_) | E::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
