//! rollcall-core - Core library for Rollcall
//!
//! Offline-tolerant event check-in backed by a shared spreadsheet: the
//! participant model, the sheet client, the durable local store, the offline
//! mutation queue, and the check-in service used by every front-end.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sheets;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use models::{CheckinStatus, Participant};
