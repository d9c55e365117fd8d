use std::path::Path;

use chrono::DateTime;
use rollcall_core::models::{OperationKind, PendingOperation};
use rollcall_core::sync::OfflineQueue;
use serde::Serialize;

use crate::cli::QueueCommands;
use crate::commands::common::{connect, format_timestamp, open_store, print_json};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct QueuedOperationItem {
    pub id: i64,
    pub kind: OperationKind,
    pub participant_id: String,
    pub requested_by: String,
    pub requested_at: String,
    pub queued_at: String,
    pub undo_reason: Option<String>,
}

pub async fn run_queue(command: QueueCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        QueueCommands::List { json } => run_queue_list(json, db_path).await,
        QueueCommands::Flush { json } => run_queue_flush(json, db_path).await,
        QueueCommands::Drop { id } => run_queue_drop(id, db_path).await,
    }
}

pub fn operation_to_item(operation: &PendingOperation) -> QueuedOperationItem {
    let queued_at = DateTime::from_timestamp_millis(operation.created_at).map_or_else(
        || operation.created_at.to_string(),
        |queued_at| format_timestamp(&queued_at),
    );

    QueuedOperationItem {
        id: operation.id,
        kind: operation.kind,
        participant_id: operation.payload.participant_id.clone(),
        requested_by: operation.payload.requested_by.clone(),
        requested_at: format_timestamp(&operation.payload.requested_at),
        queued_at,
        undo_reason: operation.payload.undo_reason.clone(),
    }
}

pub fn format_operation_line(operation: &PendingOperation) -> String {
    let item = operation_to_item(operation);
    format!(
        "{:>5}  {:<12}  {:<16}  {}  by {}",
        item.id,
        item.kind.as_str(),
        item.participant_id,
        item.requested_at,
        item.requested_by
    )
}

async fn run_queue_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let queue = OfflineQueue::new(open_store(db_path).await?);
    let operations = queue.queued_operations().await?;

    if as_json {
        let items = operations
            .iter()
            .map(operation_to_item)
            .collect::<Vec<QueuedOperationItem>>();
        return print_json(&items);
    }

    if operations.is_empty() {
        println!("Offline queue is empty");
    }
    for operation in &operations {
        println!("{}", format_operation_line(operation));
    }
    Ok(())
}

async fn run_queue_flush(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let app = connect(open_store(db_path).await?).await?;
    let report = app.replay().await?;

    if as_json {
        return print_json(&report);
    }

    println!("Replayed {} queued operations", report.applied);
    if report.remaining > 0 {
        println!(
            "{} still waiting; the sheet is unreachable",
            report.remaining
        );
    }
    Ok(())
}

async fn run_queue_drop(id: i64, db_path: &Path) -> Result<(), CliError> {
    let queue = OfflineQueue::new(open_store(db_path).await?);
    if !queue.discard(id).await? {
        return Err(CliError::QueueEntryNotFound(id));
    }
    println!("Dropped queued operation {id}");
    Ok(())
}
