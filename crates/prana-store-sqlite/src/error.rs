//! Error type for `prana-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] prana_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("stored value parse error: {0}")]
  Parse(String),
}

/// Collapse into the domain taxonomy: business failures pass through,
/// everything else is a backend failure.
impl From<Error> for prana_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => prana_core::Error::Backend(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
