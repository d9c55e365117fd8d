//! A1-notation ranges addressed to one sheet tab.

use super::columns::column_index_to_letter;

/// Rectangular slice of a sheet. Rows are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetRange {
    /// Overrides the client's default sheet name
    pub sheet_name: Option<String>,
    /// Row holding the headers; defaults to 1
    pub start_row: Option<u32>,
    pub end_row: Option<u32>,
    pub start_column: Option<usize>,
    pub end_column: Option<usize>,
}

impl SheetRange {
    /// First row of the range, which is read as the header row.
    pub fn header_row(&self) -> u32 {
        self.start_row.unwrap_or(1)
    }

    /// Render as `'<sheet>'!<col><row>:<col><row>`.
    ///
    /// Open ends default to column A, column Z and no row bound.
    pub fn to_a1(&self, default_sheet: &str) -> String {
        let col_start = self
            .start_column
            .map_or_else(|| "A".to_string(), column_index_to_letter);
        let col_end = self
            .end_column
            .map_or_else(|| "Z".to_string(), column_index_to_letter);
        let row_end = self.end_row.map(|row| row.to_string()).unwrap_or_default();
        let sheet = self.sheet_name.as_deref().unwrap_or(default_sheet);

        with_sheet(
            sheet,
            &format!("{col_start}{}:{col_end}{row_end}", self.header_row()),
        )
    }
}

/// Prefix an A1 reference with a quoted sheet name, unless the name is empty.
pub fn with_sheet(sheet_name: &str, reference: &str) -> String {
    if sheet_name.is_empty() {
        reference.to_string()
    } else {
        format!("'{}'!{reference}", sheet_name.replace('\'', "''"))
    }
}

/// The whole populated area of a sheet.
pub fn whole_sheet(sheet_name: &str) -> String {
    if sheet_name.is_empty() {
        "A:ZZZ".to_string()
    } else {
        format!("'{}'", sheet_name.replace('\'', "''"))
    }
}

/// The header row of a sheet.
pub fn header_row(sheet_name: &str) -> String {
    with_sheet(sheet_name, "1:1")
}

/// A single cell addressed by 0-based column and 1-based row.
pub fn cell(sheet_name: &str, column: usize, row: u32) -> String {
    with_sheet(
        sheet_name,
        &format!("{}{row}", column_index_to_letter(column)),
    )
}
