//! # referral-store
//!
//! Relational storage for the doctor referral service, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for the four
//! entities: doctors, connections, appointments and messages.  Callers hold
//! plain integer foreign keys; there is no in-memory object graph.

pub mod appointments;
pub mod connections;
pub mod database;
pub mod doctors;
pub mod messages;
pub mod migrations;
pub mod models;

mod error;
mod rows;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
