//! Studio key-value settings.
//!
//! Free-form keys (studio name, address, socials) plus the one key the
//! booking lifecycle reads: `cancellation_minutes`.

use serde::{Deserialize, Serialize};

use crate::policy::{CancellationPolicy, DEFAULT_CANCELLATION_MINUTES};

/// Key holding the cancellation window, in minutes, as a decimal string.
pub const CANCELLATION_MINUTES_KEY: &str = "cancellation_minutes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioSetting {
  pub key:   String,
  pub value: String,
}

/// Parse the cancellation policy out of a raw setting value, falling back
/// to the default on a missing or malformed entry.
pub fn cancellation_policy(raw: Option<&str>) -> CancellationPolicy {
  let window_minutes = raw
    .and_then(|v| v.trim().parse::<i64>().ok())
    .filter(|m| *m > 0)
    .unwrap_or(DEFAULT_CANCELLATION_MINUTES);
  CancellationPolicy { window_minutes }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_configured_window() {
    assert_eq!(cancellation_policy(Some("60")).window_minutes, 60);
  }

  #[test]
  fn falls_back_on_missing_or_garbage() {
    assert_eq!(
      cancellation_policy(None).window_minutes,
      DEFAULT_CANCELLATION_MINUTES
    );
    assert_eq!(
      cancellation_policy(Some("soon")).window_minutes,
      DEFAULT_CANCELLATION_MINUTES
    );
    assert_eq!(
      cancellation_policy(Some("-5")).window_minutes,
      DEFAULT_CANCELLATION_MINUTES
    );
  }
}
