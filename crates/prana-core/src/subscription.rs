//! Subscription plans and the per-client visit ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Plans ───────────────────────────────────────────────────────────────────

/// A purchasable package definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
  pub plan_id:       Uuid,
  pub name:          String,
  /// `None` means unlimited visits for the duration.
  pub visits_total:  Option<u32>,
  pub duration_days: u32,
  /// Price in the studio's minor currency unit.
  pub price:         i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPlan {
  pub name:          String,
  pub visits_total:  Option<u32>,
  pub duration_days: u32,
  pub price:         i64,
}

impl NewPlan {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Validation("plan name must not be empty".into()));
    }
    if self.duration_days < 1 {
      return Err(Error::Validation("duration_days must be at least 1".into()));
    }
    if self.visits_total == Some(0) {
      return Err(Error::Validation(
        "visits_total must be positive, or null for unlimited".into(),
      ));
    }
    Ok(())
  }
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// A client's purchased package of visit credits with a validity window.
///
/// Invariant for finite plans: `0 ≤ visits_remaining ≤ visits_total`.
/// Unlimited plans carry `None` in both fields and are never mutated by the
/// booking lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id:  Uuid,
  pub client_id:        Uuid,
  pub plan_id:          Uuid,
  pub visits_total:     Option<u32>,
  pub visits_remaining: Option<u32>,
  pub activation_date:  NaiveDate,
  pub end_date:         NaiveDate,
  pub is_active:        bool,
}

impl Subscription {
  pub fn is_unlimited(&self) -> bool { self.visits_total.is_none() }

  /// Whether this subscription can back a new booking as of `date`:
  /// active, not expired, and with at least one visit left (or unlimited).
  pub fn is_usable(&self, date: NaiveDate) -> bool {
    self.is_active
      && self.end_date >= date
      && match self.visits_remaining {
        Some(left) => left > 0,
        None => true,
      }
  }
}

/// Input for granting a subscription to a client. Visit counts are copied
/// from the plan at grant time so later plan edits don't retroactively
/// change sold packages.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubscription {
  pub client_id:       Uuid,
  pub plan_id:         Uuid,
  pub activation_date: NaiveDate,
}

/// Staff edit of an existing subscription. `None` fields are left unchanged.
/// `visits_remaining` edits are clamped to `visits_total` by the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionUpdate {
  pub visits_remaining: Option<u32>,
  pub end_date:         Option<NaiveDate>,
  pub is_active:        Option<bool>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sub(remaining: Option<u32>, end: NaiveDate, active: bool) -> Subscription {
    Subscription {
      subscription_id:  Uuid::new_v4(),
      client_id:        Uuid::new_v4(),
      plan_id:          Uuid::new_v4(),
      visits_total:     remaining.map(|_| 10),
      visits_remaining: remaining,
      activation_date:  NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
      end_date:         end,
      is_active:        active,
    }
  }

  #[test]
  fn usable_requires_visits_left() {
    let end = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    assert!(sub(Some(3), end, true).is_usable(day));
    assert!(!sub(Some(0), end, true).is_usable(day));
  }

  #[test]
  fn unlimited_is_usable_until_expiry() {
    let end = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    assert!(sub(None, end, true).is_usable(end));
    assert!(!sub(None, end, true).is_usable(end.succ_opt().unwrap()));
  }

  #[test]
  fn inactive_is_never_usable() {
    let end = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    assert!(!sub(Some(5), end, false).is_usable(day));
  }
}
