//! Walk-in visits billed through fitness aggregator platforms.
//!
//! These are bookkeeping records only — they never touch sessions,
//! subscriptions, or the booking lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorVisit {
  pub visit_id:        Uuid,
  /// Platform name, e.g. "1Fit".
  pub aggregator_name: String,
  pub client_name:     String,
  /// Payout per visit in the studio's minor currency unit.
  pub price:           i64,
  pub notes:           Option<String>,
  pub website_url:     Option<String>,
  pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAggregatorVisit {
  pub aggregator_name: String,
  pub client_name:     String,
  pub price:           i64,
  pub notes:           Option<String>,
  pub website_url:     Option<String>,
}
