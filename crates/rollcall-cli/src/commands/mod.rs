pub mod checkin;
pub mod common;
pub mod config;
pub mod list;
pub mod queue;
pub mod search;
pub mod sheet;
pub mod undo;
