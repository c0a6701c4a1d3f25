//! HTTP server for the Prana studio backend.
//!
//! Wires the JSON API from `prana-api` behind Basic-auth middleware, and
//! adds the routes that need server-only concerns: the database change
//! webhook relay, the staff WhatsApp-link tool, and a health check.

pub mod auth;
pub mod error;
pub mod notify;
pub mod webhook;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::{get, post}};
use prana_core::store::StudioStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use notify::Notifier;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` or
/// `PRANA_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub db_path:            PathBuf,
  /// Shared secret the database webhook must present as `?secret=`.
  pub webhook_secret:     String,
  pub telegram_bot_token: Option<String>,
  pub telegram_chat_id:   Option<String>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: StudioStore> {
  pub store:    Arc<S>,
  pub config:   Arc<ServerConfig>,
  pub notifier: Arc<Notifier>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
///
/// `/api/*` requires Basic auth (phone + password against stored argon2
/// hashes); `/hooks/db` authenticates with the shared secret instead; the
/// health check is open.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: StudioStore + Clone + 'static,
{
  let api = prana_api::api_router(state.store.clone()).layer(
    middleware::from_fn_with_state(state.clone(), auth::require_identity::<S>),
  );

  let tools = Router::new()
    .route("/tools/whatsapp-link", post(notify::link_handler))
    .layer(middleware::from_fn_with_state(
      state.clone(),
      auth::require_identity::<S>,
    ));

  Router::new()
    .route("/hooks/db", post(webhook::handler::<S>))
    .route("/health", get(|| async { "ok" }))
    .with_state(state)
    .nest("/api", api)
    .merge(tools)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
