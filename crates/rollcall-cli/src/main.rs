//! Rollcall CLI - front desk check-in from the command line
//!
//! Searches, check-ins and undos go to the shared sheet when it is reachable
//! and wait in the local offline queue when it is not.

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::checkin::run_checkin;
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::list::run_list;
use crate::commands::queue::run_queue;
use crate::commands::search::run_search;
use crate::commands::sheet::run_sheet;
use crate::commands::undo::run_undo;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "rollcall=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;

    match cli.command {
        Commands::Search { name, json } => run_search(&name, json, &db_path).await,
        Commands::Checkin { id, json } => run_checkin(&id, json, &db_path).await,
        Commands::Undo { id, reason, json } => {
            run_undo(&id, reason.as_deref(), json, &db_path).await
        }
        Commands::List { offline, json } => run_list(offline, json, &db_path).await,
        Commands::Queue { command } => run_queue(command, &db_path).await,
        Commands::Sheet { command } => run_sheet(command, &db_path).await,
        Commands::Config { command } => run_config(command, &db_path).await,
    }
}
