//! Durable local store for Rollcall

mod config_repository;
mod connection;
mod migrations;
mod participant_repository;
mod pending_operation_repository;

pub use config_repository::{keys as config_keys, ConfigRepository, LibSqlConfigRepository};
pub use connection::Database;
pub use participant_repository::{LibSqlParticipantRepository, ParticipantRepository};
pub(crate) use pending_operation_repository::{
    LibSqlPendingOperationRepository, PendingOperationRepository,
};
