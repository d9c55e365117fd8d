//! Participant-level operations on a spreadsheet.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;

use super::columns::{ColumnMap, SystemColumn};
use super::range::{self, SheetRange};
use super::transport::{HttpSheetsTransport, SheetsTransport, SpreadsheetMetadata, ValueRange};
use crate::models::{CheckinStatus, Participant};
use crate::{Error, Result};

/// Sheet tab used when none is configured
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Actor recorded in `_updated_by` when a participant carries none
const FALLBACK_UPDATED_BY: &str = "system";

static SPREADSHEET_URL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("spreadsheet URL pattern is valid")
});

/// Outcome of an advisory connection check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SpreadsheetMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionResult {
    const fn connected(metadata: SpreadsheetMetadata) -> Self {
        Self {
            success: true,
            metadata: Some(metadata),
            error: None,
        }
    }

    const fn failed(error: String) -> Self {
        Self {
            success: false,
            metadata: None,
            error: Some(error),
        }
    }
}

/// Extract the spreadsheet id from a sharing URL.
pub fn extract_spreadsheet_id(url: &str) -> Result<String> {
    SPREADSHEET_URL_ID
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| Error::InvalidInput(format!("invalid spreadsheet URL: {url}")))
}

/// Reads and writes participant rows of one spreadsheet tab.
#[derive(Debug, Clone)]
pub struct SheetsClient<T> {
    spreadsheet_id: String,
    sheet_name: String,
    transport: T,
}

impl<T: SheetsTransport> SheetsClient<T> {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        transport: T,
    ) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            transport,
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Check that a spreadsheet is reachable. Never fails: every error is
    /// reported in the result.
    pub async fn test_connection(&self, sheet_url: Option<&str>) -> ConnectionResult {
        let spreadsheet_id = match sheet_url {
            Some(url) => match extract_spreadsheet_id(url) {
                Ok(id) => id,
                Err(error) => return ConnectionResult::failed(error.to_string()),
            },
            None => self.spreadsheet_id.clone(),
        };

        match self.transport.get_spreadsheet(&spreadsheet_id).await {
            Ok(metadata) => ConnectionResult::connected(metadata),
            Err(error) => {
                tracing::warn!("Connection check for {} failed: {}", spreadsheet_id, error);
                ConnectionResult::failed(error.to_string())
            }
        }
    }

    /// Read every participant row below the header row.
    pub async fn read_participants(&self, range: Option<&SheetRange>) -> Result<Vec<Participant>> {
        let (a1, header_row) = match range {
            Some(range) => (range.to_a1(&self.sheet_name), range.header_row()),
            None => (range::whole_sheet(&self.sheet_name), 1),
        };

        let rows = self.transport.get_values(&self.spreadsheet_id, &a1).await?;
        let Some((headers, body)) = rows.split_first() else {
            return Ok(Vec::new());
        };

        let columns = ColumnMap::from_headers(headers.as_slice());
        let missing = columns.missing_system_columns();
        if !missing.is_empty() {
            tracing::debug!(
                "Sheet '{}' lacks system columns: {:?}",
                self.sheet_name,
                missing
            );
        }

        body.iter()
            .enumerate()
            .map(|(index, row)| {
                let row_number = u32::try_from(index + 1)
                    .ok()
                    .and_then(|offset| header_row.checked_add(offset))
                    .ok_or_else(|| Error::InvalidInput("sheet has too many rows".into()))?;
                Ok(participant_from_row(row, &columns, row_number))
            })
            .collect()
    }

    /// Write the check-in columns of one participant row in a single batch.
    ///
    /// Unknown columns are never touched. Cleared optional fields are written
    /// as empty cells so stale values do not survive an undo.
    pub async fn update_participant(&self, participant: &Participant) -> Result<()> {
        let row_number = participant.row_number.ok_or_else(|| {
            Error::PreconditionFailed(format!(
                "row number required to update participant {}",
                participant.id
            ))
        })?;

        let columns = self.read_header_columns().await?;
        if !columns.has_writable_columns() {
            return Err(Error::PreconditionFailed(format!(
                "sheet '{}' has no system columns; add them before checking in",
                self.sheet_name
            )));
        }

        let data: Vec<ValueRange> = SystemColumn::WRITABLE
            .into_iter()
            .filter_map(|column| {
                let index = columns.system(column)?;
                Some(ValueRange::cell(
                    range::cell(&self.sheet_name, index, row_number),
                    system_cell_value(participant, column),
                ))
            })
            .collect();

        self.transport
            .batch_update_values(&self.spreadsheet_id, &data)
            .await?;
        tracing::debug!(
            "Wrote {} cells for participant {} at row {}",
            data.len(),
            participant.id,
            row_number
        );
        Ok(())
    }

    /// Append any missing system columns after the existing headers.
    ///
    /// Existing columns are never moved or removed. Returns the headers that
    /// were added; when nothing is missing no write is issued.
    pub async fn add_system_columns(&self) -> Result<Vec<SystemColumn>> {
        let header_range = range::header_row(&self.sheet_name);
        let headers = self.read_header_row(&header_range).await?;
        let missing = ColumnMap::from_headers(headers.as_slice()).missing_system_columns();

        if missing.is_empty() {
            return Ok(missing);
        }

        let mut new_headers = headers;
        new_headers.extend(missing.iter().map(|column| column.header().to_string()));
        self.transport
            .update_values(&self.spreadsheet_id, &header_range, vec![new_headers])
            .await?;

        tracing::info!(
            "Added {} system columns to sheet '{}'",
            missing.len(),
            self.sheet_name
        );
        Ok(missing)
    }

    async fn read_header_columns(&self) -> Result<ColumnMap> {
        let headers = self
            .read_header_row(&range::header_row(&self.sheet_name))
            .await?;
        Ok(ColumnMap::from_headers(headers.as_slice()))
    }

    async fn read_header_row(&self, header_range: &str) -> Result<Vec<String>> {
        let rows = self
            .transport
            .get_values(&self.spreadsheet_id, header_range)
            .await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }
}

impl SheetsClient<HttpSheetsTransport> {
    /// Bearer token obtained by the sign-in flow.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.transport.set_access_token(token);
    }

    pub fn clear_access_token(&mut self) {
        self.transport.clear_access_token();
    }
}

fn participant_from_row(row: &[String], columns: &ColumnMap, row_number: u32) -> Participant {
    let text = |index: Option<usize>| -> Option<String> {
        index
            .and_then(|index| row.get(index))
            .filter(|value| !value.is_empty())
            .cloned()
    };
    let system = |column: SystemColumn| text(columns.system(column));
    let timestamp = |column: SystemColumn| system(column).and_then(|raw| parse_timestamp(&raw));

    Participant {
        id: system(SystemColumn::ParticipantId)
            .unwrap_or_else(|| format!("participant-{row_number}")),
        name: text(Some(columns.name())).unwrap_or_default(),
        email: text(Some(columns.email())),
        checkin_status: system(SystemColumn::CheckinStatus)
            .map_or(CheckinStatus::NotCheckedIn, |raw| {
                CheckinStatus::from_wire(&raw)
            }),
        checkin_at: timestamp(SystemColumn::CheckinAt),
        checkin_by: system(SystemColumn::CheckinBy),
        updated_at: timestamp(SystemColumn::UpdatedAt),
        updated_by: system(SystemColumn::UpdatedBy),
        audit_note: system(SystemColumn::AuditNote),
        row_number: Some(row_number),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(error) => {
            tracing::warn!("Ignoring unparseable timestamp '{}': {}", raw, error);
            None
        }
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn system_cell_value(participant: &Participant, column: SystemColumn) -> String {
    match column {
        SystemColumn::ParticipantId => participant.id.clone(),
        SystemColumn::CheckinStatus => participant.checkin_status.as_wire().to_string(),
        SystemColumn::CheckinAt => participant.checkin_at.map(format_timestamp).unwrap_or_default(),
        SystemColumn::CheckinBy => participant.checkin_by.clone().unwrap_or_default(),
        SystemColumn::UpdatedAt => format_timestamp(participant.updated_at.unwrap_or_else(Utc::now)),
        SystemColumn::UpdatedBy => participant
            .updated_by
            .clone()
            .unwrap_or_else(|| FALLBACK_UPDATED_BY.to_string()),
        SystemColumn::AuditNote => participant.audit_note.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{grid, FakeSheets, SheetCall};
    use pretty_assertions::assert_eq;

    fn client(fake: &FakeSheets) -> SheetsClient<FakeSheets> {
        SheetsClient::new("sheet-123", DEFAULT_SHEET_NAME, fake.clone())
    }

    fn full_headers() -> Vec<&'static str> {
        vec![
            "name",
            "email",
            "_participant_id",
            "_checkin_status",
            "_checkin_at",
            "_checkin_by",
            "_updated_at",
            "_updated_by",
            "_audit_note",
        ]
    }

    #[test]
    fn extracts_id_from_sharing_url() {
        assert_eq!(
            extract_spreadsheet_id(
                "https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0"
            )
            .unwrap(),
            "1AbC-d_9"
        );
        assert!(matches!(
            extract_spreadsheet_id("https://example.com/doc/1"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_maps_system_columns_and_row_numbers() {
        let fake = FakeSheets::new(grid(&[
            &["name", "email", "_participant_id", "_checkin_status", "_updated_at"],
            &["田中太郎", "tanaka@example.com", "p001", "checked_in", "2024-01-10T09:00:00.000Z"],
        ]));

        let participants = client(&fake).read_participants(None).await.unwrap();
        assert_eq!(participants.len(), 1);
        let p = &participants[0];
        assert_eq!(p.id, "p001");
        assert_eq!(p.name, "田中太郎");
        assert_eq!(p.email.as_deref(), Some("tanaka@example.com"));
        assert_eq!(p.checkin_status, CheckinStatus::CheckedIn);
        assert_eq!(p.row_number, Some(2));
        assert_eq!(
            p.updated_at,
            Some(DateTime::parse_from_rfc3339("2024-01-10T09:00:00Z").unwrap().with_timezone(&Utc))
        );
        assert_eq!(p.checkin_at, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_without_system_columns_synthesizes_ids() {
        let fake = FakeSheets::new(grid(&[
            &["timestamp", "name", "email"],
            &["2024-01-01", "田中太郎", "tanaka@example.com"],
            &["2024-01-02", "山田花子"],
        ]));

        let participants = client(&fake).read_participants(None).await.unwrap();
        assert_eq!(participants[0].id, "participant-2");
        assert_eq!(participants[0].checkin_status, CheckinStatus::NotCheckedIn);
        assert_eq!(participants[1].id, "participant-3");
        assert_eq!(participants[1].email, None);
        assert_eq!(participants[1].row_number, Some(3));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_empty_sheet_returns_nothing() {
        let fake = FakeSheets::new(Vec::new());
        assert!(client(&fake).read_participants(None).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_with_range_offsets_row_numbers_from_header_row() {
        let fake = FakeSheets::new(grid(&[&["name", "_participant_id"], &["田中太郎", "p001"]]));
        let range = SheetRange {
            start_row: Some(5),
            ..SheetRange::default()
        };

        let participants = client(&fake).read_participants(Some(&range)).await.unwrap();
        assert_eq!(participants[0].row_number, Some(6));
        assert_eq!(
            fake.calls(),
            vec![SheetCall::GetValues("'Sheet1'!A5:Z".to_string())]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_without_row_number_writes_nothing() {
        let fake = FakeSheets::new(grid(&[&full_headers()]));

        let error = client(&fake)
            .update_participant(&Participant::new("p001", "田中太郎"))
            .await
            .unwrap_err();
        assert!(matches!(&error, Error::PreconditionFailed(msg) if msg.contains("row number required")));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_writes_only_system_columns_in_one_batch() {
        let fake = FakeSheets::new(grid(&[
            &["_audit_note", "name", "memo", "_checkin_status", "_checkin_at"],
            &["", "田中太郎", "VIP", "", ""],
        ]));
        let at = DateTime::parse_from_rfc3339("2024-01-10T09:00:00Z").unwrap().with_timezone(&Utc);
        let participant = Participant {
            checkin_status: CheckinStatus::CheckedIn,
            checkin_at: Some(at),
            audit_note: Some("Checked in".into()),
            row_number: Some(2),
            ..Participant::new("participant-2", "田中太郎")
        };

        client(&fake).update_participant(&participant).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                SheetCall::GetValues("'Sheet1'!1:1".to_string()),
                SheetCall::BatchUpdate(vec![
                    ValueRange::cell("'Sheet1'!D2".into(), "checked_in"),
                    ValueRange::cell("'Sheet1'!E2".into(), "2024-01-10T09:00:00.000Z"),
                    ValueRange::cell("'Sheet1'!A2".into(), "Checked in"),
                ]),
            ]
        );
        assert_eq!(fake.row(2)[2], "VIP");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_clears_absent_fields_with_empty_cells() {
        let fake = FakeSheets::new(grid(&[
            &full_headers(),
            &["田中太郎", "", "p001", "checked_in", "2024-01-10T09:00:00.000Z", "staff@example.com", "", "", ""],
        ]));
        let participant = Participant {
            updated_by: Some("staff@example.com".into()),
            row_number: Some(2),
            ..Participant::new("p001", "田中太郎")
        };

        client(&fake).update_participant(&participant).await.unwrap();

        let row = fake.row(2);
        assert_eq!(row[3], "not_checked_in");
        assert_eq!(row[4], "");
        assert_eq!(row[5], "");
        assert!(!row[6].is_empty(), "updated_at is always stamped");
        assert_eq!(row[7], "staff@example.com");
        assert_eq!(row[2], "p001", "id column is not rewritten");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_rejects_sheet_without_system_columns() {
        let fake = FakeSheets::new(grid(&[&["name", "email"], &["田中太郎", ""]]));
        let participant = Participant {
            row_number: Some(2),
            ..Participant::new("participant-2", "田中太郎")
        };

        let error = client(&fake).update_participant(&participant).await.unwrap_err();
        assert!(matches!(error, Error::PreconditionFailed(_)));
        assert_eq!(fake.write_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn add_system_columns_appends_only_missing() {
        let fake = FakeSheets::new(grid(&[&["name", "email", "_checkin_status"]]));
        let client = client(&fake);

        let added = client.add_system_columns().await.unwrap();
        assert_eq!(added.len(), 6);
        assert_eq!(
            fake.row(1),
            vec![
                "name",
                "email",
                "_checkin_status",
                "_participant_id",
                "_checkin_at",
                "_checkin_by",
                "_updated_at",
                "_updated_by",
                "_audit_note",
            ]
        );
        assert_eq!(fake.write_count(), 1);

        let added_again = client.add_system_columns().await.unwrap();
        assert!(added_again.is_empty());
        assert_eq!(fake.write_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn add_system_columns_is_read_only_when_complete() {
        let fake = FakeSheets::new(grid(&[&full_headers()]));

        client(&fake).add_system_columns().await.unwrap();
        assert_eq!(
            fake.calls(),
            vec![SheetCall::GetValues("'Sheet1'!1:1".to_string())]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_reports_errors_as_values() {
        let fake = FakeSheets::new(Vec::new());
        let client = client(&fake);

        let ok = client.test_connection(None).await;
        assert!(ok.success);
        assert_eq!(ok.metadata.unwrap().spreadsheet_id, "sheet-123");

        fake.fail_next(crate::testing::Failure::Auth);
        let denied = client.test_connection(None).await;
        assert!(!denied.success);
        assert!(denied.error.unwrap().contains("401"));

        let bad_url = client.test_connection(Some("not a url")).await;
        assert!(!bad_url.success);
        assert!(bad_url.error.unwrap().contains("invalid spreadsheet URL"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transport_errors_propagate_from_reads() {
        let fake = FakeSheets::new(grid(&[&full_headers()]));
        fake.fail_next(crate::testing::Failure::Offline);

        let error = client(&fake).read_participants(None).await.unwrap_err();
        assert!(error.is_retryable());
    }
}
