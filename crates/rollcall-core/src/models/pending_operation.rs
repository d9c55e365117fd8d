//! Pending operation model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParticipantUpdate;

/// Kind of mutation waiting in the offline queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Checkin,
    UndoCheckin,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::UndoCheckin => "undo_checkin",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checkin" => Ok(Self::Checkin),
            "undo_checkin" => Ok(Self::UndoCheckin),
            other => Err(format!("unknown operation kind '{other}'")),
        }
    }
}

/// A durable mutation not yet confirmed by the sheet.
///
/// Rows are never edited in place; they are deleted once the write lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Monotonic id assigned by the local store
    pub id: i64,
    pub kind: OperationKind,
    pub payload: ParticipantUpdate,
    /// Enqueue timestamp (Unix ms), the FIFO order key
    pub created_at: i64,
}

/// Operation to enqueue; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPendingOperation {
    pub kind: OperationKind,
    pub payload: ParticipantUpdate,
    /// Defaults to the enqueue time when `None`
    pub created_at: Option<i64>,
}

impl NewPendingOperation {
    #[must_use]
    pub const fn new(kind: OperationKind, payload: ParticipantUpdate) -> Self {
        Self {
            kind,
            payload,
            created_at: None,
        }
    }

    #[must_use]
    pub const fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }
}
