//! # selam-store
//!
//! SQLite-backed document store for the Selam backend.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for the daily verse
//! collection, registered push tokens and the "already notified" markers.

pub mod database;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod push_tokens;
pub mod verses;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
