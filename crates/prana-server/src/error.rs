//! Server-level error type for auth, webhook, and tooling routes.

use axum::{
  Json,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden")]
  Forbidden,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(String),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"prana\"")],
        Json(json!({ "error": "unauthorized" })),
      )
        .into_response(),
      Error::Forbidden => {
        (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response()
      }
      Error::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      Error::Store(m) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": m })),
      )
        .into_response(),
    }
  }
}
