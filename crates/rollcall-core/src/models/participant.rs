//! Participant model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire value marking a checked-in row in `_checkin_status`.
pub const CHECKED_IN_WIRE: &str = "checked_in";
/// Wire value written when a row is not checked in.
pub const NOT_CHECKED_IN_WIRE: &str = "not_checked_in";

/// Check-in state of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckinStatus {
    #[default]
    NotCheckedIn,
    CheckedIn,
}

impl CheckinStatus {
    /// Parse a cell value. Anything other than `checked_in` is not checked in.
    pub fn from_wire(value: &str) -> Self {
        if value == CHECKED_IN_WIRE {
            Self::CheckedIn
        } else {
            Self::NotCheckedIn
        }
    }

    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::CheckedIn => CHECKED_IN_WIRE,
            Self::NotCheckedIn => NOT_CHECKED_IN_WIRE,
        }
    }
}

impl fmt::Display for CheckinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A registrant as stored in one row of the sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable key from `_participant_id`, or `participant-<row>` when absent
    pub id: String,
    /// Display name, matched exactly by search
    pub name: String,
    pub email: Option<String>,
    pub checkin_status: CheckinStatus,
    /// Set iff `checkin_status` is `CheckedIn`
    pub checkin_at: Option<DateTime<Utc>>,
    pub checkin_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    /// Free-text trail of the last action
    pub audit_note: Option<String>,
    /// 1-based sheet row; the only valid write target
    pub row_number: Option<u32>,
}

impl Participant {
    /// Create a not-checked-in participant that has not been located in a sheet.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            checkin_status: CheckinStatus::NotCheckedIn,
            checkin_at: None,
            checkin_by: None,
            updated_at: None,
            updated_by: None,
            audit_note: None,
            row_number: None,
        }
    }

    #[must_use]
    pub fn is_checked_in(&self) -> bool {
        self.checkin_status == CheckinStatus::CheckedIn
    }

    /// Key used by the resolution cache and name lookups.
    #[must_use]
    pub fn search_key(&self) -> &str {
        normalize_name_for_search(&self.name)
    }
}

/// Normalize a name for exact-match lookup.
///
/// Only surrounding whitespace is removed. Matching stays case-sensitive and
/// does not fold diacritics or width variants.
pub fn normalize_name_for_search(name: &str) -> &str {
    name.trim()
}

/// A recorded check-in state change, replayable against a fresh read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub participant_id: String,
    /// Target status after the update applies
    pub checkin_status: CheckinStatus,
    pub checkin_at: Option<DateTime<Utc>>,
    pub checkin_by: Option<String>,
    pub audit_note: Option<String>,
    #[serde(default)]
    pub undo_reason: Option<String>,
    /// Actor who requested the change
    pub requested_by: String,
    /// When the operator asked for the change (undo window reference)
    pub requested_at: DateTime<Utc>,
}
