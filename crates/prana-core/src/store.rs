//! The `StudioStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `prana-store-sqlite`).
//! Higher layers (`prana-api`, `prana-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! The booking lifecycle operations (`book_session`, `cancel_booking`,
//! `set_booking_status`) are store methods rather than free functions so a
//! backend can run their check-then-act sequences atomically: the capacity
//! check, duplicate check, subscription selection, insert, and visit debit
//! must observe a single consistent snapshot or two concurrent bookings can
//! overshoot a session's capacity.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  aggregator::{AggregatorVisit, NewAggregatorVisit},
  booking::{Booking, BookingReceipt, BookingStatus},
  news::{NewPost, NewsPost},
  policy::Actor,
  profile::{ClientProfile, ClientUpdate, LeadStatus, NewClient, StoredCredentials},
  schedule::{ClassSession, ClassType, Coach, NewClassType, NewCoach, NewSession, SessionCard, SessionOccupancy},
  settings::StudioSetting,
  subscription::{NewPlan, NewSubscription, Subscription, SubscriptionPlan, SubscriptionUpdate},
};

/// Abstraction over a Prana storage backend.
pub trait StudioStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Create and persist a client (or lead) profile.
  fn add_client(
    &self,
    input: NewClient,
  ) -> impl Future<Output = Result<ClientProfile, Self::Error>> + Send + '_;

  /// Retrieve a profile by UUID. Returns `None` if not found.
  fn get_client(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ClientProfile>, Self::Error>> + Send + '_;

  /// List client-role profiles, optionally filtered by lead status.
  fn list_clients(
    &self,
    lead_status: Option<LeadStatus>,
  ) -> impl Future<Output = Result<Vec<ClientProfile>, Self::Error>> + Send + '_;

  /// Privileged enumeration of every profile, admins included. Backs the
  /// admin user-management view; `list_clients` stays client-only.
  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<ClientProfile>, Self::Error>> + Send + '_;

  /// Apply a partial staff edit and return the updated profile.
  fn update_client(
    &self,
    id: Uuid,
    update: ClientUpdate,
  ) -> impl Future<Output = Result<ClientProfile, Self::Error>> + Send + '_;

  /// Set the funnel tag. Any status may follow any other.
  fn set_lead_status(
    &self,
    id: Uuid,
    status: LeadStatus,
  ) -> impl Future<Output = Result<ClientProfile, Self::Error>> + Send + '_;

  /// Look up sign-in credentials by phone. Returns `None` for unknown
  /// phones and for profiles provisioned without a password.
  fn credentials_for<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<Option<StoredCredentials>, Self::Error>> + Send + 'a;

  // ── Coaches ───────────────────────────────────────────────────────────

  fn add_coach(
    &self,
    input: NewCoach,
  ) -> impl Future<Output = Result<Coach, Self::Error>> + Send + '_;

  fn list_coaches(
    &self,
  ) -> impl Future<Output = Result<Vec<Coach>, Self::Error>> + Send + '_;

  fn remove_coach(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Class types ───────────────────────────────────────────────────────

  fn add_class_type(
    &self,
    input: NewClassType,
  ) -> impl Future<Output = Result<ClassType, Self::Error>> + Send + '_;

  fn list_class_types(
    &self,
  ) -> impl Future<Output = Result<Vec<ClassType>, Self::Error>> + Send + '_;

  fn remove_class_type(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn add_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<ClassSession, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ClassSession>, Self::Error>> + Send + '_;

  /// List sessions starting inside `[from, to]`, each with its occupancy,
  /// ordered by start time.
  fn list_sessions(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<SessionCard>, Self::Error>> + Send + '_;

  /// Replace the schedulable fields of a session.
  fn update_session(
    &self,
    id: Uuid,
    input: NewSession,
  ) -> impl Future<Output = Result<ClassSession, Self::Error>> + Send + '_;

  fn remove_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Seats booked versus capacity, counting non-cancelled bookings.
  fn session_occupancy(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<SessionOccupancy, Self::Error>> + Send + '_;

  // ── Booking lifecycle ─────────────────────────────────────────────────

  /// Book `client_id` onto `session_id`, debiting one visit from the
  /// soonest-expiring usable subscription. Runs atomically.
  ///
  /// Fails with `SessionFull`, `DuplicateBooking`, or
  /// `NoActiveSubscription`.
  fn book_session(
    &self,
    session_id: Uuid,
    client_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<BookingReceipt, Self::Error>> + Send + '_;

  /// Cancel a booking (soft delete: status becomes `cancelled`, the row is
  /// retained) and credit the debited visit back, capped at the
  /// subscription's total.
  ///
  /// The cancellation window is a hard block for `Actor::Client` and
  /// requires the override flag for `Actor::Staff` when inside the window.
  /// Cancelling an already-cancelled booking fails with `AlreadyCancelled`
  /// and never credits twice.
  fn cancel_booking(
    &self,
    booking_id: Uuid,
    actor: Actor,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  /// Staff attendance override: flip a live booking between `booked` and
  /// `completed`, or cancel it. The visit credit-back fires only on the
  /// transition into `cancelled`; no other transition touches the ledger.
  /// `cancelled` is terminal: any status change on a cancelled booking
  /// fails with `AlreadyCancelled` (re-seating the client is a fresh
  /// `book_session`, with all its checks).
  fn set_booking_status(
    &self,
    booking_id: Uuid,
    status: BookingStatus,
    actor: Actor,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  fn get_booking(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Booking>, Self::Error>> + Send + '_;

  fn list_session_bookings(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;

  fn list_client_bookings(
    &self,
    client_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;

  // ── Plans and subscriptions ───────────────────────────────────────────

  fn add_plan(
    &self,
    input: NewPlan,
  ) -> impl Future<Output = Result<SubscriptionPlan, Self::Error>> + Send + '_;

  fn list_plans(
    &self,
  ) -> impl Future<Output = Result<Vec<SubscriptionPlan>, Self::Error>> + Send + '_;

  fn remove_plan(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Grant a plan to a client, copying the plan's visit count and deriving
  /// `end_date` from `activation_date + duration_days`.
  fn grant_subscription(
    &self,
    input: NewSubscription,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  fn get_subscription(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  fn list_client_subscriptions(
    &self,
    client_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Subscription>, Self::Error>> + Send + '_;

  /// Staff edit; `visits_remaining` is clamped to `visits_total`.
  fn update_subscription(
    &self,
    id: Uuid,
    update: SubscriptionUpdate,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  /// The subscription a new booking would debit: usable as of `as_of`,
  /// soonest `end_date` first (consume the one expiring soonest).
  fn active_subscription(
    &self,
    client_id: Uuid,
    as_of: NaiveDate,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  // ── Settings ──────────────────────────────────────────────────────────

  fn get_setting<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Insert or overwrite one key.
  fn put_setting<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn list_settings(
    &self,
  ) -> impl Future<Output = Result<Vec<StudioSetting>, Self::Error>> + Send + '_;

  // ── News ──────────────────────────────────────────────────────────────

  fn publish_news(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<NewsPost, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_news(
    &self,
  ) -> impl Future<Output = Result<Vec<NewsPost>, Self::Error>> + Send + '_;

  fn remove_news(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Aggregator visits ─────────────────────────────────────────────────

  fn add_aggregator_visit(
    &self,
    input: NewAggregatorVisit,
  ) -> impl Future<Output = Result<AggregatorVisit, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_aggregator_visits(
    &self,
  ) -> impl Future<Output = Result<Vec<AggregatorVisit>, Self::Error>> + Send + '_;

  fn remove_aggregator_visit(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
