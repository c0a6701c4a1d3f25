//! Handlers for studio settings, news posts, and the aggregator visit log.

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use prana_core::{
  aggregator::{AggregatorVisit, NewAggregatorVisit},
  news::{NewPost, NewsPost},
  profile::Identity,
  settings::StudioSetting,
  store::StudioStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiError, require_admin};

// ─── Settings ─────────────────────────────────────────────────────────────────

/// `GET /settings`
pub async fn list_settings<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<StudioSetting>>, ApiError> {
  require_admin(&identity)?;
  Ok(Json(store.list_settings().await.map_err(ApiError::store)?))
}

/// `GET /settings/{key}`
pub async fn get_setting<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(key): Path<String>,
) -> Result<Json<StudioSetting>, ApiError> {
  require_admin(&identity)?;
  let value = store
    .get_setting(&key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("setting {key:?} not found")))?;
  Ok(Json(StudioSetting { key, value }))
}

#[derive(Debug, Deserialize)]
pub struct SettingBody {
  pub value: String,
}

/// `PUT /settings/{key}` — insert or overwrite.
pub async fn put_setting<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(key): Path<String>,
  Json(body): Json<SettingBody>,
) -> Result<Json<StudioSetting>, ApiError> {
  require_admin(&identity)?;
  store.put_setting(&key, &body.value).await.map_err(ApiError::store)?;
  Ok(Json(StudioSetting { key, value: body.value }))
}

// ─── News ─────────────────────────────────────────────────────────────────────

/// `GET /news` — newest first; visible to clients.
pub async fn list_news<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(_identity): Extension<Identity>,
) -> Result<Json<Vec<NewsPost>>, ApiError> {
  Ok(Json(store.list_news().await.map_err(ApiError::store)?))
}

/// `POST /news`
pub async fn publish_news<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<NewPost>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;
  let post = store.publish_news(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(post)))
}

/// `DELETE /news/{id}`
pub async fn delete_news<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&identity)?;
  store.remove_news(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Aggregator visits ────────────────────────────────────────────────────────

/// `GET /aggregator-visits` — newest first.
pub async fn list_visits<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<AggregatorVisit>>, ApiError> {
  require_admin(&identity)?;
  Ok(Json(store.list_aggregator_visits().await.map_err(ApiError::store)?))
}

/// `POST /aggregator-visits` — log a walk-in sourced from a marketplace.
pub async fn create_visit<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<NewAggregatorVisit>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;
  let visit = store.add_aggregator_visit(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(visit)))
}

/// `DELETE /aggregator-visits/{id}`
pub async fn delete_visit<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&identity)?;
  store.remove_aggregator_visit(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
