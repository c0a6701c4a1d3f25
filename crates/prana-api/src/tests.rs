use std::sync::Arc;

use axum::{
  Extension, Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use prana_core::{
  profile::{Identity, LeadStatus, NewClient, Role},
  schedule::{NewClassType, NewCoach, NewSession},
  store::StudioStore,
  subscription::{NewPlan, NewSubscription},
};
use prana_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

fn app(store: Arc<SqliteStore>, identity: Identity) -> Router {
  api_router(store).layer(Extension(identity))
}

fn admin() -> Identity {
  Identity { profile_id: Uuid::new_v4(), role: Role::Admin }
}

async fn send(
  app: Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

struct Fixture {
  store:   Arc<SqliteStore>,
  session: Uuid,
  client:  Uuid,
}

/// One future session (capacity 2), one signed-up client holding a
/// 3-visit subscription.
async fn fixture(starts_in: Duration) -> Fixture {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());

  let coach = store
    .add_coach(NewCoach { name: "Dasha".into(), bio: None, phone: None })
    .await
    .unwrap();
  let class_type = store
    .add_class_type(NewClassType {
      name:        "Vinyasa".into(),
      color:       None,
      description: None,
    })
    .await
    .unwrap();
  let start = Utc::now() + starts_in;
  let session = store
    .add_session(NewSession {
      class_type_id: class_type.class_type_id,
      coach_id:      coach.coach_id,
      start_time:    start,
      end_time:      start + Duration::hours(1),
      capacity:      2,
    })
    .await
    .unwrap();
  let client = store
    .add_client(NewClient {
      first_name:    "Anna".into(),
      last_name:     None,
      phone:         "+79990000001".into(),
      email:         None,
      role:          Role::Client,
      lead_status:   LeadStatus::Active,
      notes:         None,
      password_hash: None,
    })
    .await
    .unwrap();
  let plan = store
    .add_plan(NewPlan {
      name:          "3 visits".into(),
      visits_total:  Some(3),
      duration_days: 30,
      price:         4500,
    })
    .await
    .unwrap();
  store
    .grant_subscription(NewSubscription {
      client_id:       client.profile_id,
      plan_id:         plan.plan_id,
      activation_date: Utc::now().date_naive(),
    })
    .await
    .unwrap();

  Fixture { store, session: session.session_id, client: client.profile_id }
}

// ─── Role gating ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn client_cannot_list_clients() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };
  let (status, _) = send(app(fx.store.clone(), me), "GET", "/clients", None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn client_cannot_read_someone_elses_profile() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: Uuid::new_v4(), role: Role::Client };
  let (status, _) = send(
    app(fx.store.clone(), me),
    "GET",
    &format!("/clients/{}", fx.client),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_provisions_a_client_account() {
  let fx = fixture(Duration::hours(5)).await;
  let (status, body) = send(
    app(fx.store.clone(), admin()),
    "POST",
    "/clients",
    Some(json!({
      "first_name": "Boris",
      "phone":      "+79990000002",
      "password":   "om-mani"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["lead_status"], "booked");
  // The hash must never appear in a response.
  assert!(body.get("password_hash").is_none());

  let creds = fx.store.credentials_for("+79990000002").await.unwrap();
  assert!(creds.is_some());
}

#[tokio::test]
async fn user_listing_is_admin_only_and_includes_admins() {
  let fx = fixture(Duration::hours(5)).await;
  fx.store
    .add_client(NewClient {
      first_name:    "Olga".into(),
      last_name:     None,
      phone:         "+79990000009".into(),
      email:         None,
      role:          Role::Admin,
      lead_status:   LeadStatus::Active,
      notes:         None,
      password_hash: None,
    })
    .await
    .unwrap();

  let me = Identity { profile_id: fx.client, role: Role::Client };
  let (status, _) = send(app(fx.store.clone(), me), "GET", "/users", None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(app(fx.store.clone(), admin()), "GET", "/users", None).await;
  assert_eq!(status, StatusCode::OK);
  let users = body.as_array().unwrap();
  assert_eq!(users.len(), 2);
  assert!(users.iter().any(|u| u["role"] == "admin"));
}

// ─── Booking flow ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn client_books_a_seat_and_sees_the_debit() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  let (status, body) = send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": fx.session })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["booking"]["status"], "booked");
  assert_eq!(body["subscription"]["visits_remaining"], 2);
}

#[tokio::test]
async fn duplicate_booking_is_a_conflict() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };
  let payload = json!({ "session_id": fx.session });

  let (status, _) =
    send(app(fx.store.clone(), me), "POST", "/bookings", Some(payload.clone())).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) =
    send(app(fx.store.clone(), me), "POST", "/bookings", Some(payload)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("already has a booking"));
}

#[tokio::test]
async fn booking_without_subscription_is_unprocessable() {
  let fx = fixture(Duration::hours(5)).await;
  let lead = fx
    .store
    .add_client(NewClient {
      first_name:    "Lead".into(),
      last_name:     None,
      phone:         "+79990000003".into(),
      email:         None,
      role:          Role::Client,
      lead_status:   LeadStatus::Booked,
      notes:         None,
      password_hash: None,
    })
    .await
    .unwrap();
  let me = Identity { profile_id: lead.profile_id, role: Role::Client };

  let (status, _) = send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": fx.session })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn client_cannot_book_for_someone_else() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: Uuid::new_v4(), role: Role::Client };

  let (status, _) = send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": fx.session, "client_id": fx.client })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn booking_an_unknown_session_is_not_found() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  let (status, _) = send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": Uuid::new_v4() })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Cancellation window over HTTP ────────────────────────────────────────────

#[tokio::test]
async fn late_cancel_conflicts_for_clients_but_staff_can_override() {
  // Starts in 30 minutes, inside the default 90-minute window.
  let fx = fixture(Duration::minutes(30)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  let (status, body) = send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": fx.session })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let booking_id = body["booking"]["booking_id"].as_str().unwrap().to_owned();

  let (status, _) = send(
    app(fx.store.clone(), me),
    "POST",
    &format!("/bookings/{booking_id}/cancel"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, body) = send(
    app(fx.store.clone(), admin()),
    "POST",
    &format!("/bookings/{booking_id}/cancel"),
    Some(json!({ "override_window": true })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn attendance_marking_is_admin_only() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  let (status, body) = send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": fx.session })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let booking_id = body["booking"]["booking_id"].as_str().unwrap().to_owned();

  let (status, _) = send(
    app(fx.store.clone(), me),
    "PUT",
    &format!("/bookings/{booking_id}/status"),
    Some(json!({ "status": "completed" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(
    app(fx.store.clone(), admin()),
    "PUT",
    &format!("/bookings/{booking_id}/status"),
    Some(json!({ "status": "completed" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "completed");
}

// ─── Schedule and occupancy ───────────────────────────────────────────────────

#[tokio::test]
async fn timetable_reports_occupancy() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": fx.session })),
  )
  .await;

  let (status, body) = send(app(fx.store.clone(), me), "GET", "/sessions", None).await;
  assert_eq!(status, StatusCode::OK);
  let cards = body.as_array().unwrap();
  assert_eq!(cards.len(), 1);
  assert_eq!(cards[0]["occupancy"]["booked"], 1);
  assert_eq!(cards[0]["occupancy"]["capacity"], 2);
}

#[tokio::test]
async fn session_mutations_are_admin_only() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  let (status, _) = send(
    app(fx.store.clone(), me),
    "DELETE",
    &format!("/sessions/{}", fx.session),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = send(
    app(fx.store.clone(), admin()),
    "DELETE",
    &format!("/sessions/{}", fx.session),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);
}

// ─── Settings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn settings_are_admin_gated_and_round_trip() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  let (status, _) = send(app(fx.store.clone(), me), "GET", "/settings", None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = send(
    app(fx.store.clone(), admin()),
    "PUT",
    "/settings/cancellation_minutes",
    Some(json!({ "value": "120" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send(
    app(fx.store.clone(), admin()),
    "GET",
    "/settings/cancellation_minutes",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["value"], "120");
}

// ─── Per-client history ───────────────────────────────────────────────────────

#[tokio::test]
async fn client_reads_own_history_and_active_subscription() {
  let fx = fixture(Duration::hours(5)).await;
  let me = Identity { profile_id: fx.client, role: Role::Client };

  send(
    app(fx.store.clone(), me),
    "POST",
    "/bookings",
    Some(json!({ "session_id": fx.session })),
  )
  .await;

  let (status, body) = send(
    app(fx.store.clone(), me),
    "GET",
    &format!("/clients/{}/bookings", fx.client),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (status, body) = send(
    app(fx.store.clone(), me),
    "GET",
    &format!("/clients/{}/subscriptions/active", fx.client),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["visits_remaining"], 2);
}
