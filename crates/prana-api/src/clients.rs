//! Handlers for `/clients` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/clients` | Admin. Optional `?lead_status=booked\|attended\|…` |
//! | `GET`  | `/users` | Admin. Every profile, admins included |
//! | `POST` | `/clients` | Admin. Optional `password` provisions a sign-in |
//! | `GET`  | `/clients/{id}` | Owner or admin |
//! | `PUT`  | `/clients/{id}` | Admin |
//! | `PUT`  | `/clients/{id}/lead-status` | Admin |
//! | `GET`  | `/clients/{id}/bookings` | Owner or admin |
//! | `GET`  | `/clients/{id}/subscriptions` | Owner or admin |
//! | `GET`  | `/clients/{id}/subscriptions/active` | Owner or admin |

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use prana_core::{
  booking::Booking,
  profile::{ClientProfile, ClientUpdate, Identity, LeadStatus, NewClient, Role},
  store::StudioStore,
  subscription::Subscription,
};
use rand_core::OsRng;
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiError, require_access, require_admin};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub lead_status: Option<LeadStatus>,
}

/// `GET /clients[?lead_status=<status>]`
pub async fn list<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ClientProfile>>, ApiError> {
  require_admin(&identity)?;
  let clients = store
    .list_clients(params.lead_status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(clients))
}

/// `GET /users` — every profile regardless of role, for the admin
/// user-management view.
pub async fn list_users<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<ClientProfile>>, ApiError> {
  require_admin(&identity)?;
  let users = store.list_users().await.map_err(ApiError::store)?;
  Ok(Json(users))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub first_name:  String,
  pub last_name:   Option<String>,
  pub phone:       String,
  pub email:       Option<String>,
  pub role:        Option<Role>,
  pub lead_status: Option<LeadStatus>,
  pub notes:       Option<String>,
  /// Plaintext; hashed before it reaches the store. Staff-entered leads
  /// omit it and cannot sign in until one is provisioned.
  pub password:    Option<String>,
}

/// `POST /clients`
pub async fn create<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;

  let password_hash = body.password.as_deref().map(hash_password).transpose()?;

  let client = store
    .add_client(NewClient {
      first_name: body.first_name,
      last_name: body.last_name,
      phone: body.phone,
      email: body.email,
      role: body.role.unwrap_or(Role::Client),
      lead_status: body.lead_status.unwrap_or(LeadStatus::Booked),
      notes: body.notes,
      password_hash,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(client)))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::BadRequest(format!("unusable password: {e}")))
}

// ─── Get / update one ─────────────────────────────────────────────────────────

/// `GET /clients/{id}`
pub async fn get_one<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<ClientProfile>, ApiError> {
  require_access(&identity, id)?;
  let client = store
    .get_client(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
  Ok(Json(client))
}

/// `PUT /clients/{id}`
pub async fn update<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
  Json(body): Json<ClientUpdate>,
) -> Result<Json<ClientProfile>, ApiError> {
  require_admin(&identity)?;
  let client = store.update_client(id, body).await.map_err(ApiError::store)?;
  Ok(Json(client))
}

// ─── Lead status ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LeadStatusBody {
  pub lead_status: LeadStatus,
}

/// `PUT /clients/{id}/lead-status`
pub async fn set_lead_status<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
  Json(body): Json<LeadStatusBody>,
) -> Result<Json<ClientProfile>, ApiError> {
  require_admin(&identity)?;
  let client = store
    .set_lead_status(id, body.lead_status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(client))
}

// ─── Per-client history ───────────────────────────────────────────────────────

/// `GET /clients/{id}/bookings`
pub async fn bookings<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, ApiError> {
  require_access(&identity, id)?;
  let bookings = store.list_client_bookings(id).await.map_err(ApiError::store)?;
  Ok(Json(bookings))
}

/// `GET /clients/{id}/subscriptions`
pub async fn subscriptions<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
  require_access(&identity, id)?;
  let subs = store
    .list_client_subscriptions(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subs))
}

/// `GET /clients/{id}/subscriptions/active` — the subscription the next
/// booking would debit, or 404.
pub async fn active_subscription<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError> {
  require_access(&identity, id)?;
  let sub = store
    .active_subscription(id, Utc::now().date_naive())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no usable subscription for client {id}")))?;
  Ok(Json(sub))
}
