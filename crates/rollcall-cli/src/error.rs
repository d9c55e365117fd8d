use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] rollcall_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Participant ID cannot be empty")]
    EmptyParticipantId,
    #[error("Search name cannot be empty")]
    EmptySearchName,
    #[error("Unknown config key '{0}'. Editable keys: spreadsheet_id, sheet_name")]
    UnknownConfigKey(String),
    #[error("Config value for '{0}' cannot be empty")]
    EmptyConfigValue(String),
    #[error("No queued operation with id {0}")]
    QueueEntryNotFound(i64),
    #[error("Sheet connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "The participant sheet is not configured. Set ROLLCALL_SPREADSHEET_ID and ROLLCALL_API_KEY, or run `rollcall config set spreadsheet_id <id>` with ROLLCALL_API_KEY set."
    )]
    NotConfigured,
}
