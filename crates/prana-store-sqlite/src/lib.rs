//! SQLite backend for the Prana studio store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The booking lifecycle runs inside
//! single transactions here; see the schema for the constraints that back
//! the duplicate-booking and visit-balance invariants.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
