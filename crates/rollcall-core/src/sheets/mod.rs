//! Spreadsheet access: column resolution, A1 ranges, HTTP transport, and the
//! participant-level client built on top of them.

mod client;
mod columns;
pub mod range;
mod transport;

pub use client::{extract_spreadsheet_id, ConnectionResult, SheetsClient, DEFAULT_SHEET_NAME};
pub use columns::{column_index_to_letter, ColumnMap, SystemColumn, EMAIL_HEADER, NAME_HEADER};
pub use range::SheetRange;
pub use transport::{
    HttpSheetsTransport, SheetProperties, SheetsTransport, SpreadsheetMetadata, ValueRange,
    DEFAULT_API_BASE_URL,
};
