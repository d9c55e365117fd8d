//! Header-to-column resolution for participant sheets.
//!
//! Column order is never assumed. Every read or write builds a `ColumnMap`
//! from the header row it just fetched, so reordered or missing columns are
//! tolerated without guessing at runtime.

use std::fmt;

/// Header of the user-authored name column
pub const NAME_HEADER: &str = "name";
/// Header of the user-authored email column
pub const EMAIL_HEADER: &str = "email";

/// Column B holds names on sheets without a `name` header
const NAME_FALLBACK_INDEX: usize = 1;
/// Column C holds emails on sheets without an `email` header
const EMAIL_FALLBACK_INDEX: usize = 2;

/// Reserved `_`-prefixed columns owned by the check-in system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemColumn {
    ParticipantId,
    CheckinStatus,
    CheckinAt,
    CheckinBy,
    UpdatedAt,
    UpdatedBy,
    AuditNote,
}

impl SystemColumn {
    /// Required system columns, in the order they are appended to a sheet
    pub const ALL: [Self; 7] = [
        Self::ParticipantId,
        Self::CheckinStatus,
        Self::CheckinAt,
        Self::CheckinBy,
        Self::UpdatedAt,
        Self::UpdatedBy,
        Self::AuditNote,
    ];

    /// Columns rewritten on every participant update. The id column is
    /// assigned once and never rewritten.
    pub const WRITABLE: [Self; 6] = [
        Self::CheckinStatus,
        Self::CheckinAt,
        Self::CheckinBy,
        Self::UpdatedAt,
        Self::UpdatedBy,
        Self::AuditNote,
    ];

    pub const fn header(self) -> &'static str {
        match self {
            Self::ParticipantId => "_participant_id",
            Self::CheckinStatus => "_checkin_status",
            Self::CheckinAt => "_checkin_at",
            Self::CheckinBy => "_checkin_by",
            Self::UpdatedAt => "_updated_at",
            Self::UpdatedBy => "_updated_by",
            Self::AuditNote => "_audit_note",
        }
    }
}

impl fmt::Display for SystemColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Immutable column positions resolved from one header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    name: usize,
    email: usize,
    system: [Option<usize>; SystemColumn::ALL.len()],
}

impl ColumnMap {
    /// Resolve columns by exact header name; the first duplicate wins.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let position = |wanted: &str| headers.iter().position(|h| h.as_ref() == wanted);

        let mut system = [None; SystemColumn::ALL.len()];
        for (slot, column) in system.iter_mut().zip(SystemColumn::ALL) {
            *slot = position(column.header());
        }

        Self {
            name: position(NAME_HEADER).unwrap_or(NAME_FALLBACK_INDEX),
            email: position(EMAIL_HEADER).unwrap_or(EMAIL_FALLBACK_INDEX),
            system,
        }
    }

    pub const fn name(&self) -> usize {
        self.name
    }

    pub const fn email(&self) -> usize {
        self.email
    }

    /// Position of a system column, if the sheet has it.
    pub fn system(&self, column: SystemColumn) -> Option<usize> {
        SystemColumn::ALL
            .iter()
            .position(|candidate| *candidate == column)
            .and_then(|slot| self.system[slot])
    }

    /// Required system columns the header row lacks, in append order.
    pub fn missing_system_columns(&self) -> Vec<SystemColumn> {
        SystemColumn::ALL
            .into_iter()
            .filter(|column| self.system(*column).is_none())
            .collect()
    }

    /// Whether at least one writable system column exists.
    pub fn has_writable_columns(&self) -> bool {
        SystemColumn::WRITABLE
            .iter()
            .any(|column| self.system(*column).is_some())
    }
}

/// Convert a 0-based column index to spreadsheet letters (A, B, ... Z, AA, ...).
pub fn column_index_to_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = Some(index);
    while let Some(n) = remaining {
        // n % 26 < 26, so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + (n % 26) as u8));
        remaining = (n / 26).checked_sub(1);
    }
    letters.iter().rev().collect()
}
