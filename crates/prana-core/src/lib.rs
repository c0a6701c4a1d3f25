//! Core types and trait definitions for the Prana studio backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregator;
pub mod booking;
pub mod error;
pub mod news;
pub mod notify;
pub mod policy;
pub mod profile;
pub mod schedule;
pub mod settings;
pub mod store;
pub mod subscription;

pub use error::{Error, Result};
