//! Class types, coaches, and scheduled class sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Class types ─────────────────────────────────────────────────────────────

/// A kind of class offered by the studio (e.g. "Hatha", "Stretching").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassType {
  pub class_type_id: Uuid,
  pub name:          String,
  /// Display colour as a CSS hex string.
  pub color:         Option<String>,
  pub description:   Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClassType {
  pub name:        String,
  pub color:       Option<String>,
  pub description: Option<String>,
}

// ─── Coaches ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coach {
  pub coach_id: Uuid,
  pub name:     String,
  pub bio:      Option<String>,
  pub phone:    Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCoach {
  pub name:  String,
  pub bio:   Option<String>,
  pub phone: Option<String>,
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// One scheduled occurrence of a class, with a fixed seat capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSession {
  pub session_id:    Uuid,
  pub class_type_id: Uuid,
  pub coach_id:      Uuid,
  pub start_time:    DateTime<Utc>,
  pub end_time:      DateTime<Utc>,
  pub capacity:      u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
  pub class_type_id: Uuid,
  pub coach_id:      Uuid,
  pub start_time:    DateTime<Utc>,
  pub end_time:      DateTime<Utc>,
  pub capacity:      u32,
}

impl NewSession {
  pub fn validate(&self) -> Result<()> {
    if self.capacity < 1 {
      return Err(Error::Validation("capacity must be at least 1".into()));
    }
    if self.end_time <= self.start_time {
      return Err(Error::Validation("end_time must be after start_time".into()));
    }
    Ok(())
  }
}

// ─── Occupancy read model ────────────────────────────────────────────────────

/// Seats booked versus capacity for one session. Never stored — always
/// computed from the non-cancelled bookings at query time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionOccupancy {
  pub session_id: Uuid,
  pub capacity:   u32,
  /// Bookings with status `booked` or `completed`; both occupy a seat.
  pub booked:     u32,
}

impl SessionOccupancy {
  pub fn seats_left(&self) -> u32 { self.capacity.saturating_sub(self.booked) }

  pub fn is_full(&self) -> bool { self.booked >= self.capacity }
}

/// A session bundled with its occupancy, as listed on schedule screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCard {
  pub session:   ClassSession,
  pub occupancy: SessionOccupancy,
}
