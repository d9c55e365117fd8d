//! In-memory spreadsheet used by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};

use crate::sheets::{SheetProperties, SheetsTransport, SpreadsheetMetadata, ValueRange};
use crate::util::Clock;
use crate::{Error, Result};

/// Parse an RFC 3339 literal.
pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Build a grid from string literals.
pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
        .collect()
}

/// Transport request as observed by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetCall {
    GetSpreadsheet(String),
    GetValues(String),
    BatchUpdate(Vec<ValueRange>),
    UpdateValues(String, Vec<Vec<String>>),
}

impl SheetCall {
    const fn is_write(&self) -> bool {
        matches!(self, Self::BatchUpdate(_) | Self::UpdateValues(..))
    }
}

/// Injected transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Offline,
    Timeout,
    Auth,
    Transport,
}

impl Failure {
    fn to_error(self) -> Error {
        match self {
            Self::Offline => Error::Offline("network unreachable".into()),
            Self::Timeout => Error::Timeout("request timed out".into()),
            Self::Auth => Error::Auth("401 Unauthorized".into()),
            Self::Transport => Error::Transport("500 Internal Server Error".into()),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    rows: Vec<Vec<String>>,
    calls: Vec<SheetCall>,
    failures: VecDeque<Failure>,
    write_failures: VecDeque<Failure>,
    offline: bool,
    writes: usize,
}

/// Shared fake spreadsheet. Clones observe the same grid.
#[derive(Debug, Clone, Default)]
pub struct FakeSheets {
    state: Arc<Mutex<State>>,
}

impl FakeSheets {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                rows,
                ..State::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Every request received, failed ones included.
    pub fn calls(&self) -> Vec<SheetCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// A 1-based row, padded to the header width.
    pub fn row(&self, number: usize) -> Vec<String> {
        let state = self.state();
        let width = state.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut row = state.rows.get(number - 1).cloned().unwrap_or_default();
        row.resize(width, String::new());
        row
    }

    /// Successful writes applied to the grid.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Fail the next request of any kind.
    pub fn fail_next(&self, failure: Failure) {
        self.state().failures.push_back(failure);
    }

    /// Fail the next `times` requests of any kind.
    pub fn fail_times(&self, failure: Failure, times: usize) {
        let mut state = self.state();
        state.failures.extend(std::iter::repeat_n(failure, times));
    }

    /// Fail the next write while letting reads through.
    pub fn fail_next_write(&self, failure: Failure) {
        self.state().write_failures.push_back(failure);
    }

    /// Fail every request with `Offline` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    fn record(&self, call: SheetCall) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        let is_write = call.is_write();
        state.calls.push(call);

        if state.offline {
            return Err(Failure::Offline.to_error());
        }
        if is_write {
            if let Some(failure) = state.write_failures.pop_front() {
                return Err(failure.to_error());
            }
        }
        if let Some(failure) = state.failures.pop_front() {
            return Err(failure.to_error());
        }
        Ok(state)
    }
}

impl SheetsTransport for FakeSheets {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetMetadata> {
        let state = self.record(SheetCall::GetSpreadsheet(spreadsheet_id.to_string()))?;
        let column_count = state.rows.iter().map(Vec::len).max().unwrap_or(0);
        Ok(SpreadsheetMetadata {
            spreadsheet_id: spreadsheet_id.to_string(),
            title: "Check-in list".to_string(),
            locale: Some("ja_JP".to_string()),
            time_zone: Some("Asia/Tokyo".to_string()),
            sheets: vec![SheetProperties {
                sheet_id: 0,
                title: "Sheet1".to_string(),
                index: 0,
                row_count: i64::try_from(state.rows.len()).unwrap(),
                column_count: i64::try_from(column_count).unwrap(),
            }],
        })
    }

    async fn get_values(&self, _spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let state = self.record(SheetCall::GetValues(range.to_string()))?;
        if reference(range) == "1:1" {
            return Ok(state.rows.first().cloned().into_iter().collect());
        }
        Ok(state.rows.clone())
    }

    async fn batch_update_values(&self, _spreadsheet_id: &str, data: &[ValueRange]) -> Result<()> {
        let mut state = self.record(SheetCall::BatchUpdate(data.to_vec()))?;
        for block in data {
            write_block(&mut state.rows, &block.range, &block.values);
        }
        state.writes += 1;
        Ok(())
    }

    async fn update_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        let mut state = self.record(SheetCall::UpdateValues(range.to_string(), values.clone()))?;
        write_block(&mut state.rows, range, &values);
        state.writes += 1;
        Ok(())
    }
}

/// Strip the quoted sheet prefix from an A1 range.
fn reference(range: &str) -> &str {
    range.rsplit_once('!').map_or(range, |(_, reference)| reference)
}

/// Top-left anchor of an A1 reference: `D2`, `1:1`, or `A5:Z`.
fn anchor(range: &str) -> (usize, usize) {
    let start = reference(range).split(':').next().unwrap_or_default();
    let letters: String = start.chars().take_while(char::is_ascii_alphabetic).collect();
    let digits: String = start.chars().skip(letters.len()).collect();

    let column = letters
        .bytes()
        .fold(0usize, |acc, letter| acc * 26 + usize::from(letter - b'A' + 1))
        .saturating_sub(1);
    let row = digits.parse::<usize>().unwrap_or(1);
    (row, column)
}

fn write_block(rows: &mut Vec<Vec<String>>, range: &str, values: &[Vec<String>]) {
    let (first_row, first_column) = anchor(range);
    for (row_offset, value_row) in values.iter().enumerate() {
        let row_index = first_row - 1 + row_offset;
        if rows.len() <= row_index {
            rows.resize(row_index + 1, Vec::new());
        }
        let row = &mut rows[row_index];
        for (column_offset, value) in value_row.iter().enumerate() {
            let column = first_column + column_offset;
            if row.len() <= column {
                row.resize(column + 1, String::new());
            }
            row[column] = value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_parse_cells_and_rows() {
        assert_eq!(anchor("'Sheet1'!D2"), (2, 3));
        assert_eq!(anchor("'Sheet1'!1:1"), (1, 0));
        assert_eq!(anchor("AA15"), (15, 26));
    }

    #[test]
    fn writes_grow_the_grid() {
        let mut rows = grid(&[&["name"]]);
        write_block(&mut rows, "'Sheet1'!C3", &[vec!["x".to_string()]]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec!["", "", "x"]);
    }
}
