//! Studio news posts shown on the client portal home screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsPost {
  pub post_id:      Uuid,
  pub title:        String,
  pub body:         String,
  pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
  pub title: String,
  pub body:  String,
}
