//! Data models for Rollcall

mod participant;
mod pending_operation;
mod user;

pub use participant::{
    normalize_name_for_search, CheckinStatus, Participant, ParticipantUpdate, CHECKED_IN_WIRE,
    NOT_CHECKED_IN_WIRE,
};
pub use pending_operation::{NewPendingOperation, OperationKind, PendingOperation};
pub use user::{User, UserRole};
