//! Database change webhook relay.
//!
//! An external system (a hosted database's change-capture hook) POSTs
//! `{"type": "...", "table": "...", "record": {...}, "old_record": {...}}`
//! with a shared secret in the query string. Relevant changes are relayed to
//! the staff chat; everything else is acknowledged and dropped. Delivery is
//! spawned off the request path, so the hook caller never waits on Telegram.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use prana_core::store::StudioStore;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, error::Error};

#[derive(Debug, Deserialize)]
pub struct HookParams {
  pub secret: Option<String>,
}

/// Loosely-typed change payload; unknown tables and extra fields pass
/// through deserialisation untouched.
#[derive(Debug, Deserialize)]
pub struct ChangeEvent {
  #[serde(rename = "type")]
  pub kind:       String,
  pub table:      String,
  #[serde(default)]
  pub record:     Value,
  #[serde(default)]
  pub old_record: Value,
}

// ─── Classification ───────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Relay {
  BookingCreated {
    client_id:  Option<Uuid>,
    session_id: Option<Uuid>,
  },
  BookingCancelled {
    client_id:  Option<Uuid>,
    session_id: Option<Uuid>,
  },
  ClientCreated {
    first_name: Option<String>,
    phone:      Option<String>,
  },
}

fn field_uuid(record: &Value, key: &str) -> Option<Uuid> {
  record.get(key).and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

fn field_str(record: &Value, key: &str) -> Option<String> {
  record.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Decide whether a change is worth a staff notification.
fn classify(event: &ChangeEvent) -> Option<Relay> {
  match (event.table.as_str(), event.kind.as_str()) {
    ("bookings", "INSERT") => Some(Relay::BookingCreated {
      client_id:  field_uuid(&event.record, "client_id"),
      session_id: field_uuid(&event.record, "session_id"),
    }),
    ("bookings", "UPDATE") => {
      let was = event.old_record.get("status").and_then(Value::as_str);
      let now = event.record.get("status").and_then(Value::as_str);
      // Only the transition into cancelled is interesting.
      (now == Some("cancelled") && was != Some("cancelled")).then(|| {
        Relay::BookingCancelled {
          client_id:  field_uuid(&event.record, "client_id"),
          session_id: field_uuid(&event.record, "session_id"),
        }
      })
    }
    ("profiles", "INSERT") => Some(Relay::ClientCreated {
      first_name: field_str(&event.record, "first_name"),
      phone:      field_str(&event.record, "phone"),
    }),
    _ => None,
  }
}

// ─── Rendering ────────────────────────────────────────────────────────────────

async fn describe_client<S: StudioStore>(store: &S, id: Option<Uuid>) -> String {
  if let Some(id) = id
    && let Ok(Some(client)) = store.get_client(id).await
  {
    return match client.last_name {
      Some(last) => format!("{} {last}", client.first_name),
      None => client.first_name,
    };
  }
  "a client".to_owned()
}

async fn describe_session<S: StudioStore>(store: &S, id: Option<Uuid>) -> String {
  if let Some(id) = id
    && let Ok(Some(session)) = store.get_session(id).await
  {
    return format!("the class on {}", session.start_time.format("%d.%m at %H:%M"));
  }
  "a class".to_owned()
}

/// Compose the staff message, enriching raw ids with names and times where
/// the rows still exist.
async fn render<S: StudioStore>(store: &S, relay: &Relay) -> String {
  match relay {
    Relay::BookingCreated { client_id, session_id } => format!(
      "New booking: {} signed up for {}",
      describe_client(store, *client_id).await,
      describe_session(store, *session_id).await,
    ),
    Relay::BookingCancelled { client_id, session_id } => format!(
      "Cancellation: {} dropped {}",
      describe_client(store, *client_id).await,
      describe_session(store, *session_id).await,
    ),
    Relay::ClientCreated { first_name, phone } => format!(
      "New client: {} ({})",
      first_name.as_deref().unwrap_or("unnamed"),
      phone.as_deref().unwrap_or("no phone"),
    ),
  }
}

// ─── Handler ──────────────────────────────────────────────────────────────────

/// `POST /hooks/db?secret=<shared secret>`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<HookParams>,
  body: String,
) -> Response
where
  S: StudioStore + Clone + 'static,
{
  if params.secret.as_deref() != Some(state.config.webhook_secret.as_str()) {
    return Error::Unauthorized.into_response();
  }

  let event: ChangeEvent = match serde_json::from_str(&body) {
    Ok(event) => event,
    Err(e) => {
      tracing::warn!(error = %e, "webhook payload did not parse");
      return (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("bad payload: {e}") })),
      )
        .into_response();
    }
  };

  match classify(&event) {
    Some(relay) => {
      let text = render(state.store.as_ref(), &relay).await;
      let notifier = state.notifier.clone();
      tokio::spawn(async move { notifier.send(&text).await });
      (StatusCode::OK, Json(json!({ "ok": true, "relayed": true }))).into_response()
    }
    None => {
      (StatusCode::OK, Json(json!({ "ok": true, "relayed": false }))).into_response()
    }
  }
}
