//! Handlers for coaches, class types, and the session schedule.
//!
//! Mutations are admin-only; reads are open to any authenticated identity so
//! the client portal can render the timetable.

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use prana_core::{
  profile::Identity,
  schedule::{ClassSession, ClassType, Coach, NewClassType, NewCoach, NewSession, SessionCard},
  store::StudioStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiError, require_admin};

// ─── Coaches ──────────────────────────────────────────────────────────────────

/// `GET /coaches`
pub async fn list_coaches<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(_identity): Extension<Identity>,
) -> Result<Json<Vec<Coach>>, ApiError> {
  Ok(Json(store.list_coaches().await.map_err(ApiError::store)?))
}

/// `POST /coaches`
pub async fn create_coach<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<NewCoach>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;
  let coach = store.add_coach(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(coach)))
}

/// `DELETE /coaches/{id}`
pub async fn delete_coach<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&identity)?;
  store.remove_coach(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Class types ──────────────────────────────────────────────────────────────

/// `GET /class-types`
pub async fn list_class_types<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(_identity): Extension<Identity>,
) -> Result<Json<Vec<ClassType>>, ApiError> {
  Ok(Json(store.list_class_types().await.map_err(ApiError::store)?))
}

/// `POST /class-types`
pub async fn create_class_type<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<NewClassType>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;
  let class_type = store.add_class_type(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(class_type)))
}

/// `DELETE /class-types/{id}`
pub async fn delete_class_type<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&identity)?;
  store.remove_class_type(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Sessions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WindowParams {
  pub from: Option<DateTime<Utc>>,
  pub to:   Option<DateTime<Utc>>,
}

/// `GET /sessions[?from=<rfc3339>&to=<rfc3339>]`
///
/// Defaults to the week starting now. Each entry carries live occupancy so
/// the timetable can grey out full sessions.
pub async fn list_sessions<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(_identity): Extension<Identity>,
  Query(params): Query<WindowParams>,
) -> Result<Json<Vec<SessionCard>>, ApiError> {
  let from = params.from.unwrap_or_else(Utc::now);
  let to = params.to.unwrap_or(from + Duration::days(7));
  if to < from {
    return Err(ApiError::BadRequest("`to` precedes `from`".into()));
  }
  let cards = store.list_sessions(from, to).await.map_err(ApiError::store)?;
  Ok(Json(cards))
}

/// `POST /sessions`
pub async fn create_session<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<NewSession>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;
  let session = store.add_session(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /sessions/{id}`
pub async fn get_session<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(_identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<ClassSession>, ApiError> {
  let session = store
    .get_session(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("session {id} not found")))?;
  Ok(Json(session))
}

/// `PUT /sessions/{id}`
pub async fn update_session<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewSession>,
) -> Result<Json<ClassSession>, ApiError> {
  require_admin(&identity)?;
  let session = store.update_session(id, body).await.map_err(ApiError::store)?;
  Ok(Json(session))
}

/// `DELETE /sessions/{id}`
pub async fn delete_session<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&identity)?;
  store.remove_session(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
