//! Cancellation-window policy.
//!
//! Self-service cancellation is blocked when the session starts in less than
//! the configured window. Staff may override the window, but only explicitly:
//! the API requires an override flag, mirroring the confirmation prompt shown
//! to an administrator. Cancelling after the session has started (or passed)
//! is always allowed — the seat can no longer be resold, so there is no
//! penalty to enforce.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{Error, Result};

/// Fallback when the studio settings carry no `cancellation_minutes` key.
pub const DEFAULT_CANCELLATION_MINUTES: i64 = 90;

/// Who is asking for the cancellation. The window is a hard block for
/// clients and advisory for staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
  Client,
  Staff { override_window: bool },
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CancellationPolicy {
  pub window_minutes: i64,
}

impl Default for CancellationPolicy {
  fn default() -> Self {
    Self { window_minutes: DEFAULT_CANCELLATION_MINUTES }
  }
}

impl CancellationPolicy {
  /// Authorize a cancellation of a session starting at `start_time`.
  ///
  /// Errors with [`Error::CancellationWindowViolation`] when `now` falls
  /// inside the window and the actor may not (or did not choose to)
  /// override it.
  pub fn authorize(
    &self,
    start_time: DateTime<Utc>,
    now:        DateTime<Utc>,
    actor:      Actor,
  ) -> Result<()> {
    let minutes_left = (start_time - now).num_minutes();

    // Session already started or passed: free cancellation.
    if minutes_left <= 0 {
      return Ok(());
    }
    if minutes_left >= self.window_minutes {
      return Ok(());
    }

    match actor {
      Actor::Staff { override_window: true } => Ok(()),
      _ => Err(Error::CancellationWindowViolation {
        minutes_left,
        window_minutes: self.window_minutes,
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn policy() -> CancellationPolicy {
    CancellationPolicy { window_minutes: 90 }
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
  }

  #[test]
  fn client_blocked_inside_window() {
    let start = now() + Duration::minutes(30);
    let err   = policy().authorize(start, now(), Actor::Client).unwrap_err();
    match err {
      Error::CancellationWindowViolation { minutes_left, window_minutes } => {
        assert_eq!(minutes_left, 30);
        assert_eq!(window_minutes, 90);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn client_allowed_outside_window() {
    let start = now() + Duration::minutes(90);
    assert!(policy().authorize(start, now(), Actor::Client).is_ok());
  }

  #[test]
  fn anyone_allowed_after_start() {
    let start = now() - Duration::minutes(5);
    assert!(policy().authorize(start, now(), Actor::Client).is_ok());
    let staff = Actor::Staff { override_window: false };
    assert!(policy().authorize(start, now(), staff).is_ok());
  }

  #[test]
  fn staff_blocked_inside_window_without_override() {
    let start = now() + Duration::minutes(30);
    let staff = Actor::Staff { override_window: false };
    assert!(policy().authorize(start, now(), staff).is_err());
  }

  #[test]
  fn staff_override_wins_inside_window() {
    let start = now() + Duration::minutes(30);
    let staff = Actor::Staff { override_window: true };
    assert!(policy().authorize(start, now(), staff).is_ok());
  }
}
