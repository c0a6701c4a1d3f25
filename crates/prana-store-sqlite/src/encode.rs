//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as ISO 8601
//! dates, UUIDs as hyphenated lowercase strings, enums as their lowercase
//! discriminants.

use chrono::{DateTime, NaiveDate, Utc};
use prana_core::{
  aggregator::AggregatorVisit,
  booking::{Booking, BookingStatus},
  news::NewsPost,
  profile::{ClientProfile, LeadStatus, Role},
  schedule::{ClassSession, ClassType, Coach},
  subscription::{Subscription, SubscriptionPlan},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Parse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::Parse(e.to_string()))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Client => "client",
    Role::Admin => "admin",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "client" => Ok(Role::Client),
    "admin" => Ok(Role::Admin),
    other => Err(Error::Parse(format!("unknown role: {other:?}"))),
  }
}

// ─── LeadStatus ──────────────────────────────────────────────────────────────

pub fn encode_lead_status(s: LeadStatus) -> &'static str {
  match s {
    LeadStatus::Booked => "booked",
    LeadStatus::Attended => "attended",
    LeadStatus::Paid => "paid",
    LeadStatus::Active => "active",
    LeadStatus::Inactive => "inactive",
    LeadStatus::Churned => "churned",
  }
}

pub fn decode_lead_status(s: &str) -> Result<LeadStatus> {
  match s {
    "booked" => Ok(LeadStatus::Booked),
    "attended" => Ok(LeadStatus::Attended),
    "paid" => Ok(LeadStatus::Paid),
    "active" => Ok(LeadStatus::Active),
    "inactive" => Ok(LeadStatus::Inactive),
    "churned" => Ok(LeadStatus::Churned),
    other => Err(Error::Parse(format!("unknown lead status: {other:?}"))),
  }
}

// ─── BookingStatus ───────────────────────────────────────────────────────────

pub fn encode_booking_status(s: BookingStatus) -> &'static str {
  match s {
    BookingStatus::Booked => "booked",
    BookingStatus::Completed => "completed",
    BookingStatus::Cancelled => "cancelled",
  }
}

pub fn decode_booking_status(s: &str) -> Result<BookingStatus> {
  match s {
    "booked" => Ok(BookingStatus::Booked),
    "completed" => Ok(BookingStatus::Completed),
    "cancelled" => Ok(BookingStatus::Cancelled),
    other => Err(Error::Parse(format!("unknown booking status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:  String,
  pub first_name:  String,
  pub last_name:   Option<String>,
  pub phone:       String,
  pub email:       Option<String>,
  pub role:        String,
  pub lead_status: String,
  pub balance:     i64,
  pub notes:       Option<String>,
  pub created_at:  String,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<ClientProfile> {
    Ok(ClientProfile {
      profile_id:  decode_uuid(&self.profile_id)?,
      first_name:  self.first_name,
      last_name:   self.last_name,
      phone:       self.phone,
      email:       self.email,
      role:        decode_role(&self.role)?,
      lead_status: decode_lead_status(&self.lead_status)?,
      balance:     self.balance,
      notes:       self.notes,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawCoach {
  pub coach_id: String,
  pub name:     String,
  pub bio:      Option<String>,
  pub phone:    Option<String>,
}

impl RawCoach {
  pub fn into_coach(self) -> Result<Coach> {
    Ok(Coach {
      coach_id: decode_uuid(&self.coach_id)?,
      name:     self.name,
      bio:      self.bio,
      phone:    self.phone,
    })
  }
}

pub struct RawClassType {
  pub class_type_id: String,
  pub name:          String,
  pub color:         Option<String>,
  pub description:   Option<String>,
}

impl RawClassType {
  pub fn into_class_type(self) -> Result<ClassType> {
    Ok(ClassType {
      class_type_id: decode_uuid(&self.class_type_id)?,
      name:          self.name,
      color:         self.color,
      description:   self.description,
    })
  }
}

pub struct RawSession {
  pub session_id:    String,
  pub class_type_id: String,
  pub coach_id:      String,
  pub start_time:    String,
  pub end_time:      String,
  pub capacity:      i64,
}

impl RawSession {
  pub fn into_session(self) -> Result<ClassSession> {
    Ok(ClassSession {
      session_id:    decode_uuid(&self.session_id)?,
      class_type_id: decode_uuid(&self.class_type_id)?,
      coach_id:      decode_uuid(&self.coach_id)?,
      start_time:    decode_dt(&self.start_time)?,
      end_time:      decode_dt(&self.end_time)?,
      capacity:      self.capacity as u32,
    })
  }
}

pub struct RawBooking {
  pub booking_id:      String,
  pub session_id:      String,
  pub client_id:       String,
  pub subscription_id: Option<String>,
  pub status:          String,
  pub created_at:      String,
}

impl RawBooking {
  pub fn into_booking(self) -> Result<Booking> {
    Ok(Booking {
      booking_id:      decode_uuid(&self.booking_id)?,
      session_id:      decode_uuid(&self.session_id)?,
      client_id:       decode_uuid(&self.client_id)?,
      subscription_id: self.subscription_id.as_deref().map(decode_uuid).transpose()?,
      status:          decode_booking_status(&self.status)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawPlan {
  pub plan_id:       String,
  pub name:          String,
  pub visits_total:  Option<i64>,
  pub duration_days: i64,
  pub price:         i64,
}

impl RawPlan {
  pub fn into_plan(self) -> Result<SubscriptionPlan> {
    Ok(SubscriptionPlan {
      plan_id:       decode_uuid(&self.plan_id)?,
      name:          self.name,
      visits_total:  self.visits_total.map(|v| v as u32),
      duration_days: self.duration_days as u32,
      price:         self.price,
    })
  }
}

pub struct RawSubscription {
  pub subscription_id:  String,
  pub client_id:        String,
  pub plan_id:          String,
  pub visits_total:     Option<i64>,
  pub visits_remaining: Option<i64>,
  pub activation_date:  String,
  pub end_date:         String,
  pub is_active:        bool,
}

impl RawSubscription {
  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      subscription_id:  decode_uuid(&self.subscription_id)?,
      client_id:        decode_uuid(&self.client_id)?,
      plan_id:          decode_uuid(&self.plan_id)?,
      visits_total:     self.visits_total.map(|v| v as u32),
      visits_remaining: self.visits_remaining.map(|v| v as u32),
      activation_date:  decode_date(&self.activation_date)?,
      end_date:         decode_date(&self.end_date)?,
      is_active:        self.is_active,
    })
  }
}

pub struct RawNews {
  pub post_id:      String,
  pub title:        String,
  pub body:         String,
  pub published_at: String,
}

impl RawNews {
  pub fn into_post(self) -> Result<NewsPost> {
    Ok(NewsPost {
      post_id:      decode_uuid(&self.post_id)?,
      title:        self.title,
      body:         self.body,
      published_at: decode_dt(&self.published_at)?,
    })
  }
}

pub struct RawVisit {
  pub visit_id:        String,
  pub aggregator_name: String,
  pub client_name:     String,
  pub price:           i64,
  pub notes:           Option<String>,
  pub website_url:     Option<String>,
  pub created_at:      String,
}

impl RawVisit {
  pub fn into_visit(self) -> Result<AggregatorVisit> {
    Ok(AggregatorVisit {
      visit_id:        decode_uuid(&self.visit_id)?,
      aggregator_name: self.aggregator_name,
      client_name:     self.client_name,
      price:           self.price,
      notes:           self.notes,
      website_url:     self.website_url,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
