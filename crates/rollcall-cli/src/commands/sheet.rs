use std::path::Path;

use rollcall_core::sheets::ConnectionResult;

use crate::cli::SheetCommands;
use crate::commands::common::{open_checkin, print_json};
use crate::error::CliError;

pub async fn run_sheet(command: SheetCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        SheetCommands::Test { url, json } => run_sheet_test(url.as_deref(), json, db_path).await,
        SheetCommands::InitColumns => run_sheet_init_columns(db_path).await,
    }
}

pub fn format_connection_lines(result: &ConnectionResult) -> Vec<String> {
    let Some(metadata) = &result.metadata else {
        return vec![format!(
            "Connection failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )];
    };

    let mut lines = vec![format!(
        "Connected to '{}' ({})",
        metadata.title, metadata.spreadsheet_id
    )];
    if let Some(locale) = &metadata.locale {
        lines.push(format!("Locale: {locale}"));
    }
    lines.extend(metadata.sheets.iter().map(|sheet| {
        format!(
            "  {:<20}  {} rows x {} columns",
            sheet.title, sheet.row_count, sheet.column_count
        )
    }));
    lines
}

async fn run_sheet_test(url: Option<&str>, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let app = open_checkin(db_path).await?;
    let result = app.service().client().test_connection(url).await;

    if as_json {
        print_json(&result)?;
    } else {
        for line in format_connection_lines(&result) {
            println!("{line}");
        }
    }

    if result.success {
        Ok(())
    } else {
        Err(CliError::ConnectionFailed(
            result.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

async fn run_sheet_init_columns(db_path: &Path) -> Result<(), CliError> {
    let app = open_checkin(db_path).await?;
    let added = app.service().client().add_system_columns().await?;

    if added.is_empty() {
        println!("All system columns are already present");
    } else {
        let headers = added
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("Added columns: {headers}");
    }
    Ok(())
}
