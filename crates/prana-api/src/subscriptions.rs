//! Handlers for subscription plans and granted subscriptions.
//!
//! Plans are the catalogue; a grant copies the plan's visit count onto a
//! per-client subscription row. All mutations are admin-only — clients
//! never write to their own ledger.

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use prana_core::{
  profile::Identity,
  store::StudioStore,
  subscription::{NewPlan, NewSubscription, Subscription, SubscriptionPlan, SubscriptionUpdate},
};
use uuid::Uuid;

use crate::{ApiError, require_access, require_admin};

// ─── Plans ────────────────────────────────────────────────────────────────────

/// `GET /plans` — open to clients so the portal can show the price list.
pub async fn list_plans<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(_identity): Extension<Identity>,
) -> Result<Json<Vec<SubscriptionPlan>>, ApiError> {
  Ok(Json(store.list_plans().await.map_err(ApiError::store)?))
}

/// `POST /plans`
pub async fn create_plan<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<NewPlan>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;
  let plan = store.add_plan(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(plan)))
}

/// `DELETE /plans/{id}`
pub async fn delete_plan<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  require_admin(&identity)?;
  store.remove_plan(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Subscriptions ────────────────────────────────────────────────────────────

/// `POST /subscriptions` — grant a plan to a client.
pub async fn grant<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<NewSubscription>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&identity)?;
  let sub = store.grant_subscription(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(sub)))
}

/// `GET /subscriptions/{id}`
pub async fn get_one<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError> {
  let sub = store
    .get_subscription(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subscription {id} not found")))?;
  require_access(&identity, sub.client_id)?;
  Ok(Json(sub))
}

/// `PUT /subscriptions/{id}` — staff ledger edit. `visits_remaining` is
/// clamped to the subscription's total by the store.
pub async fn update<S: StudioStore>(
  State(store): State<Arc<S>>,
  Extension(identity): Extension<Identity>,
  Path(id): Path<Uuid>,
  Json(body): Json<SubscriptionUpdate>,
) -> Result<Json<Subscription>, ApiError> {
  require_admin(&identity)?;
  let sub = store.update_subscription(id, body).await.map_err(ApiError::store)?;
  Ok(Json(sub))
}
