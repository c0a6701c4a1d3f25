//! JSON REST API for Prana.
//!
//! Exposes an axum [`Router`] backed by any [`prana_core::store::StudioStore`].
//! Authentication is the caller's responsibility: every request must carry an
//! [`Identity`](prana_core::profile::Identity) extension (the server's auth
//! middleware inserts one after verifying credentials). Handlers use it for
//! role gating — admin-only routes return 403 for client identities, and
//! client identities can only read and act on their own data.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", prana_api::api_router(store.clone()))
//! ```

pub mod bookings;
pub mod clients;
pub mod error;
pub mod schedule;
pub mod studio;
pub mod subscriptions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use prana_core::{profile::Identity, store::StudioStore};
use uuid::Uuid;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: StudioStore + 'static,
{
  Router::new()
    // Clients and the lead funnel
    .route("/clients", get(clients::list::<S>).post(clients::create::<S>))
    .route("/clients/{id}", get(clients::get_one::<S>).put(clients::update::<S>))
    .route("/clients/{id}/lead-status", put(clients::set_lead_status::<S>))
    .route("/clients/{id}/bookings", get(clients::bookings::<S>))
    .route("/clients/{id}/subscriptions", get(clients::subscriptions::<S>))
    .route(
      "/clients/{id}/subscriptions/active",
      get(clients::active_subscription::<S>),
    )
    .route("/users", get(clients::list_users::<S>))
    // Schedule
    .route("/coaches", get(schedule::list_coaches::<S>).post(schedule::create_coach::<S>))
    .route("/coaches/{id}", delete(schedule::delete_coach::<S>))
    .route(
      "/class-types",
      get(schedule::list_class_types::<S>).post(schedule::create_class_type::<S>),
    )
    .route("/class-types/{id}", delete(schedule::delete_class_type::<S>))
    .route("/sessions", get(schedule::list_sessions::<S>).post(schedule::create_session::<S>))
    .route(
      "/sessions/{id}",
      get(schedule::get_session::<S>)
        .put(schedule::update_session::<S>)
        .delete(schedule::delete_session::<S>),
    )
    .route("/sessions/{id}/bookings", get(bookings::for_session::<S>))
    // Booking lifecycle
    .route("/bookings", post(bookings::create::<S>))
    .route("/bookings/{id}", get(bookings::get_one::<S>))
    .route("/bookings/{id}/cancel", post(bookings::cancel::<S>))
    .route("/bookings/{id}/status", put(bookings::set_status::<S>))
    // Plans and subscriptions
    .route("/plans", get(subscriptions::list_plans::<S>).post(subscriptions::create_plan::<S>))
    .route("/plans/{id}", delete(subscriptions::delete_plan::<S>))
    .route("/subscriptions", post(subscriptions::grant::<S>))
    .route(
      "/subscriptions/{id}",
      get(subscriptions::get_one::<S>).put(subscriptions::update::<S>),
    )
    // Studio settings, news, aggregator log
    .route("/settings", get(studio::list_settings::<S>))
    .route("/settings/{key}", get(studio::get_setting::<S>).put(studio::put_setting::<S>))
    .route("/news", get(studio::list_news::<S>).post(studio::publish_news::<S>))
    .route("/news/{id}", delete(studio::delete_news::<S>))
    .route("/aggregator-visits", get(studio::list_visits::<S>).post(studio::create_visit::<S>))
    .route("/aggregator-visits/{id}", delete(studio::delete_visit::<S>))
    .with_state(store)
}

/// Admin gate for staff-only routes.
pub(crate) fn require_admin(identity: &Identity) -> Result<(), ApiError> {
  if identity.is_admin() {
    Ok(())
  } else {
    Err(ApiError::Forbidden("admin role required".into()))
  }
}

/// Owner-or-admin gate for per-client data.
pub(crate) fn require_access(identity: &Identity, owner: Uuid) -> Result<(), ApiError> {
  if identity.may_access(owner) {
    Ok(())
  } else {
    Err(ApiError::Forbidden("not your resource".into()))
  }
}

#[cfg(test)]
mod tests;
