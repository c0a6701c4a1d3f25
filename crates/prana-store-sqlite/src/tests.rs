use chrono::{Duration, Utc};
use prana_core::{
  booking::BookingStatus,
  policy::Actor,
  profile::{LeadStatus, NewClient, Role},
  schedule::{NewClassType, NewCoach, NewSession},
  settings::CANCELLATION_MINUTES_KEY,
  store::StudioStore,
  subscription::{NewPlan, NewSubscription, SubscriptionUpdate},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn test_store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

struct Studio {
  store:         SqliteStore,
  class_type_id: Uuid,
  coach_id:      Uuid,
}

impl Studio {
  async fn new() -> Self {
    let store = test_store().await;
    let coach = store
      .add_coach(NewCoach {
        name:  "Dasha".into(),
        bio:   None,
        phone: None,
      })
      .await
      .unwrap();
    let class_type = store
      .add_class_type(NewClassType {
        name:        "Hatha".into(),
        color:       Some("#7c9a72".into()),
        description: None,
      })
      .await
      .unwrap();
    Self {
      store,
      class_type_id: class_type.class_type_id,
      coach_id: coach.coach_id,
    }
  }

  async fn session(&self, capacity: u32, starts_in: Duration) -> Uuid {
    let start = Utc::now() + starts_in;
    self
      .store
      .add_session(NewSession {
        class_type_id: self.class_type_id,
        coach_id:      self.coach_id,
        start_time:    start,
        end_time:      start + Duration::hours(1),
        capacity,
      })
      .await
      .unwrap()
      .session_id
  }

  async fn client(&self, name: &str, phone: &str) -> Uuid {
    self
      .store
      .add_client(NewClient {
        first_name:    name.into(),
        last_name:     None,
        phone:         phone.into(),
        email:         None,
        role:          Role::Client,
        lead_status:   LeadStatus::Active,
        notes:         None,
        password_hash: None,
      })
      .await
      .unwrap()
      .profile_id
  }

  async fn plan(&self, visits: Option<u32>) -> Uuid {
    self
      .store
      .add_plan(NewPlan {
        name:          match visits {
          Some(n) => format!("{n} visits"),
          None => "Unlimited".into(),
        },
        visits_total:  visits,
        duration_days: 30,
        price:         5000,
      })
      .await
      .unwrap()
      .plan_id
  }

  async fn subscribe(&self, client_id: Uuid, plan_id: Uuid) -> Uuid {
    self
      .store
      .grant_subscription(NewSubscription {
        client_id,
        plan_id,
        activation_date: Utc::now().date_naive(),
      })
      .await
      .unwrap()
      .subscription_id
  }
}

#[tokio::test]
async fn booking_debits_one_visit() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  studio.subscribe(client, plan).await;

  let receipt = studio
    .store
    .book_session(session, client, Utc::now())
    .await
    .unwrap();

  assert_eq!(receipt.subscription.visits_remaining, Some(2));
  assert_eq!(receipt.booking.status, BookingStatus::Booked);
  assert_eq!(receipt.booking.subscription_id, Some(receipt.subscription.subscription_id));
}

#[tokio::test]
async fn cancel_credits_the_visit_back() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  let sub = studio.subscribe(client, plan).await;

  let receipt = studio
    .store
    .book_session(session, client, Utc::now())
    .await
    .unwrap();
  studio
    .store
    .cancel_booking(receipt.booking.booking_id, Actor::Client, Utc::now())
    .await
    .unwrap();

  let after = studio.store.get_subscription(sub).await.unwrap().unwrap();
  assert_eq!(after.visits_remaining, Some(3));
}

#[tokio::test]
async fn second_cancel_is_rejected_and_does_not_credit_again() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  let sub = studio.subscribe(client, plan).await;

  let receipt = studio
    .store
    .book_session(session, client, Utc::now())
    .await
    .unwrap();
  let bid = receipt.booking.booking_id;
  studio.store.cancel_booking(bid, Actor::Client, Utc::now()).await.unwrap();

  let err = studio
    .store
    .cancel_booking(bid, Actor::Client, Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(prana_core::Error::AlreadyCancelled(_))));

  let after = studio.store.get_subscription(sub).await.unwrap().unwrap();
  assert_eq!(after.visits_remaining, Some(3));
}

#[tokio::test]
async fn full_session_rejects_further_bookings() {
  let studio = Studio::new().await;
  let session = studio.session(1, Duration::hours(5)).await;
  let plan = studio.plan(Some(10)).await;

  let first = studio.client("Anna", "+79990000001").await;
  studio.subscribe(first, plan).await;
  let second = studio.client("Boris", "+79990000002").await;
  studio.subscribe(second, plan).await;

  studio.store.book_session(session, first, Utc::now()).await.unwrap();
  let err = studio
    .store
    .book_session(session, second, Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(prana_core::Error::SessionFull(_))));
}

#[tokio::test]
async fn cancelled_seat_frees_capacity() {
  let studio = Studio::new().await;
  let session = studio.session(1, Duration::hours(5)).await;
  let plan = studio.plan(Some(10)).await;

  let first = studio.client("Anna", "+79990000001").await;
  studio.subscribe(first, plan).await;
  let second = studio.client("Boris", "+79990000002").await;
  studio.subscribe(second, plan).await;

  let receipt = studio.store.book_session(session, first, Utc::now()).await.unwrap();
  studio
    .store
    .cancel_booking(receipt.booking.booking_id, Actor::Client, Utc::now())
    .await
    .unwrap();

  studio.store.book_session(session, second, Utc::now()).await.unwrap();
  let occ = studio.store.session_occupancy(session).await.unwrap();
  assert_eq!(occ.booked, 1);
  assert!(occ.is_full());
}

#[tokio::test]
async fn duplicate_booking_is_rejected() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(10)).await;
  studio.subscribe(client, plan).await;

  studio.store.book_session(session, client, Utc::now()).await.unwrap();
  let err = studio
    .store
    .book_session(session, client, Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(prana_core::Error::DuplicateBooking { .. })));
}

#[tokio::test]
async fn rebooking_after_cancel_is_allowed() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  let sub = studio.subscribe(client, plan).await;

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  studio
    .store
    .cancel_booking(receipt.booking.booking_id, Actor::Client, Utc::now())
    .await
    .unwrap();

  let again = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  assert_eq!(again.subscription.subscription_id, sub);
  assert_eq!(again.subscription.visits_remaining, Some(2));
}

#[tokio::test]
async fn no_usable_subscription_blocks_booking() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;

  let err = studio
    .store
    .book_session(session, client, Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(prana_core::Error::NoActiveSubscription(_))));
}

#[tokio::test]
async fn exhausted_subscription_is_not_selected() {
  let studio = Studio::new().await;
  let first = studio.session(10, Duration::hours(5)).await;
  let second = studio.session(10, Duration::hours(7)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(1)).await;
  studio.subscribe(client, plan).await;

  studio.store.book_session(first, client, Utc::now()).await.unwrap();
  let err = studio
    .store
    .book_session(second, client, Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(prana_core::Error::NoActiveSubscription(_))));
}

#[tokio::test]
async fn expired_subscription_is_not_selected() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(10)).await;
  let sub = studio.subscribe(client, plan).await;

  let yesterday = (Utc::now() - Duration::days(1)).date_naive();
  studio
    .store
    .update_subscription(sub, SubscriptionUpdate {
      visits_remaining: None,
      end_date:         Some(yesterday),
      is_active:        None,
    })
    .await
    .unwrap();

  let err = studio
    .store
    .book_session(session, client, Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(prana_core::Error::NoActiveSubscription(_))));
}

#[tokio::test]
async fn unlimited_plan_is_never_debited() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(None).await;
  let sub = studio.subscribe(client, plan).await;

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  assert_eq!(receipt.subscription.visits_remaining, None);

  studio
    .store
    .cancel_booking(receipt.booking.booking_id, Actor::Client, Utc::now())
    .await
    .unwrap();
  let after = studio.store.get_subscription(sub).await.unwrap().unwrap();
  assert_eq!(after.visits_remaining, None);
}

#[tokio::test]
async fn soonest_expiring_subscription_is_consumed_first() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;

  let long_plan = studio.plan(Some(10)).await;
  let long_sub = studio.subscribe(client, long_plan).await;
  let short_sub = studio.subscribe(client, long_plan).await;
  let soon = (Utc::now() + Duration::days(3)).date_naive();
  studio
    .store
    .update_subscription(short_sub, SubscriptionUpdate {
      visits_remaining: None,
      end_date:         Some(soon),
      is_active:        None,
    })
    .await
    .unwrap();

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  assert_eq!(receipt.subscription.subscription_id, short_sub);

  let untouched = studio.store.get_subscription(long_sub).await.unwrap().unwrap();
  assert_eq!(untouched.visits_remaining, Some(10));
}

#[tokio::test]
async fn client_cannot_cancel_inside_the_window() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::minutes(30)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  let sub = studio.subscribe(client, plan).await;

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  let err = studio
    .store
    .cancel_booking(receipt.booking.booking_id, Actor::Client, Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(prana_core::Error::CancellationWindowViolation { .. })
  ));

  // The visit stays spent.
  let after = studio.store.get_subscription(sub).await.unwrap().unwrap();
  assert_eq!(after.visits_remaining, Some(2));
}

#[tokio::test]
async fn staff_override_cancels_inside_the_window() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::minutes(30)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  let sub = studio.subscribe(client, plan).await;

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  studio
    .store
    .cancel_booking(
      receipt.booking.booking_id,
      Actor::Staff { override_window: true },
      Utc::now(),
    )
    .await
    .unwrap();

  let after = studio.store.get_subscription(sub).await.unwrap().unwrap();
  assert_eq!(after.visits_remaining, Some(3));
}

#[tokio::test]
async fn window_width_comes_from_settings() {
  let studio = Studio::new().await;
  // 30 minutes out is fine under a 10-minute window.
  studio.store.put_setting(CANCELLATION_MINUTES_KEY, "10").await.unwrap();

  let session = studio.session(10, Duration::minutes(30)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  studio.subscribe(client, plan).await;

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  studio
    .store
    .cancel_booking(receipt.booking.booking_id, Actor::Client, Utc::now())
    .await
    .unwrap();
}

#[tokio::test]
async fn attendance_transitions_do_not_touch_the_ledger() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  let sub = studio.subscribe(client, plan).await;

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  let bid = receipt.booking.booking_id;

  let completed = studio
    .store
    .set_booking_status(bid, BookingStatus::Completed, Actor::Staff { override_window: true }, Utc::now())
    .await
    .unwrap();
  assert_eq!(completed.status, BookingStatus::Completed);

  let back = studio
    .store
    .set_booking_status(bid, BookingStatus::Booked, Actor::Staff { override_window: true }, Utc::now())
    .await
    .unwrap();
  assert_eq!(back.status, BookingStatus::Booked);

  let after = studio.store.get_subscription(sub).await.unwrap().unwrap();
  assert_eq!(after.visits_remaining, Some(2));
}

#[tokio::test]
async fn cancelled_bookings_are_terminal() {
  let studio = Studio::new().await;
  let session = studio.session(10, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  let sub = studio.subscribe(client, plan).await;
  let staff = Actor::Staff { override_window: true };

  let receipt = studio.store.book_session(session, client, Utc::now()).await.unwrap();
  let bid = receipt.booking.booking_id;
  studio.store.cancel_booking(bid, Actor::Client, Utc::now()).await.unwrap();

  // Reviving the row and cancelling again would credit the same visit
  // twice; any transition out of cancelled is rejected instead.
  for status in [BookingStatus::Booked, BookingStatus::Completed] {
    let err = studio
      .store
      .set_booking_status(bid, status, staff, Utc::now())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Core(prana_core::Error::AlreadyCancelled(_))));
  }

  let after = studio.store.get_subscription(sub).await.unwrap().unwrap();
  assert_eq!(after.visits_remaining, Some(3));
  let booking = studio.store.get_booking(bid).await.unwrap().unwrap();
  assert_eq!(booking.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn staff_edit_of_visits_is_clamped_to_the_plan_total() {
  let studio = Studio::new().await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(5)).await;
  let sub = studio.subscribe(client, plan).await;

  let after = studio
    .store
    .update_subscription(sub, SubscriptionUpdate {
      visits_remaining: Some(99),
      end_date:         None,
      is_active:        None,
    })
    .await
    .unwrap();
  assert_eq!(after.visits_remaining, Some(5));
}

#[tokio::test]
async fn sessions_list_carries_occupancy() {
  let studio = Studio::new().await;
  let session = studio.session(8, Duration::hours(5)).await;
  let client = studio.client("Anna", "+79990000001").await;
  let plan = studio.plan(Some(3)).await;
  studio.subscribe(client, plan).await;
  studio.store.book_session(session, client, Utc::now()).await.unwrap();

  let cards = studio
    .store
    .list_sessions(Utc::now(), Utc::now() + Duration::days(1))
    .await
    .unwrap();
  assert_eq!(cards.len(), 1);
  assert_eq!(cards[0].occupancy.booked, 1);
  assert_eq!(cards[0].occupancy.seats_left(), 7);
}

#[tokio::test]
async fn lead_status_moves_through_the_funnel() {
  let studio = Studio::new().await;
  let client = studio.client("Anna", "+79990000001").await;

  let updated = studio
    .store
    .set_lead_status(client, LeadStatus::Attended)
    .await
    .unwrap();
  assert_eq!(updated.lead_status, LeadStatus::Attended);

  let filtered = studio
    .store
    .list_clients(Some(LeadStatus::Attended))
    .await
    .unwrap();
  assert_eq!(filtered.len(), 1);
  assert_eq!(filtered[0].profile_id, client);

  let none = studio.store.list_clients(Some(LeadStatus::Churned)).await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn user_listing_spans_roles_but_client_listing_does_not() {
  let studio = Studio::new().await;
  studio.client("Anna", "+79990000001").await;
  let admin = studio
    .store
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
    .unwrap()
    .profile_id;

  let users = studio.store.list_users().await.unwrap();
  assert_eq!(users.len(), 2);
  assert!(users.iter().any(|u| u.profile_id == admin && u.role == Role::Admin));

  let clients = studio.store.list_clients(None).await.unwrap();
  assert_eq!(clients.len(), 1);
  assert!(clients.iter().all(|c| c.role == Role::Client));
}

#[tokio::test]
async fn credentials_only_exist_for_provisioned_accounts() {
  let studio = Studio::new().await;
  // A staff-entered lead has no password hash.
  studio.client("Lead", "+79990000001").await;

  assert!(studio.store.credentials_for("+79990000001").await.unwrap().is_none());

  studio
    .store
    .add_client(NewClient {
      first_name:    "Admin".into(),
      last_name:     None,
      phone:         "+79990000009".into(),
      email:         None,
      role:          Role::Admin,
      lead_status:   LeadStatus::Active,
      notes:         None,
      password_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$abc$def".into()),
    })
    .await
    .unwrap();

  let creds = studio
    .store
    .credentials_for("+79990000009")
    .await
    .unwrap()
    .expect("stored credentials");
  assert_eq!(creds.role, Role::Admin);
}

#[tokio::test]
async fn settings_round_trip_and_overwrite() {
  let store = test_store().await;
  assert!(store.get_setting("greeting").await.unwrap().is_none());

  store.put_setting("greeting", "namaste").await.unwrap();
  store.put_setting("greeting", "om").await.unwrap();
  assert_eq!(store.get_setting("greeting").await.unwrap().as_deref(), Some("om"));

  let all = store.list_settings().await.unwrap();
  assert_eq!(all.len(), 1);
}
