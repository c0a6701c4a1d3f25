//! HTTP Basic-auth verification against stored client credentials.
//!
//! The username is the profile's phone number; the password is checked
//! against the argon2 PHC string stored at provisioning time. On success the
//! resolved [`Identity`] is inserted as a request extension for the API
//! handlers' role checks.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  body::Body,
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use prana_core::{profile::Identity, store::StudioStore};

use crate::{AppState, error::Error};

/// Middleware: authenticate the request or short-circuit with 401.
pub async fn require_identity<S>(
  State(state): State<AppState<S>>,
  mut req: Request<Body>,
  next: Next,
) -> Response
where
  S: StudioStore + Clone + 'static,
{
  match verify(req.headers(), state.store.as_ref()).await {
    Ok(identity) => {
      req.extensions_mut().insert(identity);
      next.run(req).await
    }
    Err(e) => e.into_response(),
  }
}

/// Verify a `Basic phone:password` header against the store.
pub async fn verify<S: StudioStore>(headers: &HeaderMap, store: &S) -> Result<Identity, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (phone, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let stored = store
    .credentials_for(phone)
    .await
    .map_err(|e| Error::Store(e.to_string()))?
    .ok_or(Error::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&stored.password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Identity { profile_id: stored.profile_id, role: stored.role })
}
