//! Client profiles, roles, and the lead-status funnel tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Access role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Client,
  Admin,
}

/// A manually-curated funnel stage on a client profile. Deliberately flat:
/// any status may be set to any other by staff action, and no other entity
/// reacts to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
  Booked,
  Attended,
  Paid,
  Active,
  Inactive,
  Churned,
}

/// A studio member or lead. The password hash never leaves the store; it is
/// deliberately not a field here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
  pub profile_id:  Uuid,
  pub first_name:  String,
  pub last_name:   Option<String>,
  pub phone:       String,
  pub email:       Option<String>,
  pub role:        Role,
  pub lead_status: LeadStatus,
  /// Prepaid balance in the studio's minor currency unit.
  pub balance:     i64,
  pub notes:       Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input for profile creation. `password_hash` is an argon2 PHC string when
/// the client should be able to sign in; staff-entered leads may omit it.
#[derive(Debug, Clone)]
pub struct NewClient {
  pub first_name:    String,
  pub last_name:     Option<String>,
  pub phone:         String,
  pub email:         Option<String>,
  pub role:          Role,
  pub lead_status:   LeadStatus,
  pub notes:         Option<String>,
  pub password_hash: Option<String>,
}

impl NewClient {
  pub fn validate(&self) -> Result<()> {
    if self.first_name.trim().is_empty() {
      return Err(Error::Validation("first_name must not be empty".into()));
    }
    if self.phone.trim().is_empty() {
      return Err(Error::Validation("phone must not be empty".into()));
    }
    Ok(())
  }
}

/// Partial update applied by staff edits. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientUpdate {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub phone:      Option<String>,
  pub email:      Option<String>,
  pub balance:    Option<i64>,
  pub notes:      Option<String>,
}

/// The resolved identity of an authenticated request, passed explicitly to
/// every authorization check — there is no ambient current-user global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
  pub profile_id: Uuid,
  pub role:       Role,
}

impl Identity {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Whether this identity may act on data owned by `profile_id`.
  pub fn may_access(&self, profile_id: Uuid) -> bool {
    self.is_admin() || self.profile_id == profile_id
  }
}

/// Login credentials as stored; returned only to the authentication layer.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
  pub profile_id:    Uuid,
  pub role:          Role,
  pub password_hash: String,
}
