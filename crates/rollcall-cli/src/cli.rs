use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Check participants in against a shared event sheet")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find a participant by exact name
    #[command(alias = "find")]
    Search {
        /// Participant name as written in the sheet
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a participant in
    Checkin {
        /// Participant id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Revert a recent check-in
    Undo {
        /// Participant id
        id: String,
        /// Reason recorded in the audit note
        #[arg(short, long)]
        reason: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Refresh and list participant snapshots
    List {
        /// Show cached snapshots without contacting the sheet
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or replay check-ins waiting for the sheet
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Check or prepare the participant sheet
    Sheet {
        #[command(subcommand)]
        command: SheetCommands,
    },
    /// Read or change locally stored settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued operations in replay order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay queued operations against the sheet
    Flush {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop a queued operation that can never apply
    Drop {
        /// Queue entry id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SheetCommands {
    /// Verify the sheet is reachable and show its tabs
    Test {
        /// Spreadsheet URL to check instead of the configured one
        #[arg(long, value_name = "URL")]
        url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Append missing system columns to the header row
    InitColumns,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show stored settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a setting that overrides the environment
    Set {
        /// Setting key (spreadsheet_id or sheet_name)
        key: String,
        /// New value
        value: String,
    },
    /// Remove a stored setting
    Unset {
        /// Setting key (spreadsheet_id or sheet_name)
        key: String,
    },
}
