use std::path::Path;

use rollcall_core::config::AppConfig;
use rollcall_core::db::config_keys;
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::{open_store, print_json};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

pub async fn run_config(command: ConfigCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { json } => run_config_show(json, db_path).await,
        ConfigCommands::Set { key, value } => run_config_set(&key, &value, db_path).await,
        ConfigCommands::Unset { key } => run_config_unset(&key, db_path).await,
    }
}

pub fn normalize_config_key(key: &str) -> Result<&'static str, CliError> {
    let trimmed = key.trim();
    config_keys::EDITABLE
        .iter()
        .find(|editable| **editable == trimmed)
        .copied()
        .ok_or_else(|| CliError::UnknownConfigKey(trimmed.to_string()))
}

/// Validate a value for an editable key; spreadsheet URLs are reduced to their id.
pub fn normalize_config_value(key: &'static str, value: &str) -> Result<String, CliError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyConfigValue(key.to_string()));
    }
    if key == config_keys::SPREADSHEET_ID {
        Ok(AppConfig::resolve_spreadsheet_id(trimmed)?)
    } else {
        Ok(trimmed.to_string())
    }
}

async fn run_config_show(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let entries = store
        .list_config()
        .await?
        .into_iter()
        .map(|(key, value)| ConfigEntry { key, value })
        .collect::<Vec<_>>();

    if as_json {
        return print_json(&entries);
    }

    println!("Database: {}", db_path.display());
    if entries.is_empty() {
        println!("No stored settings");
    }
    for entry in &entries {
        println!("{} = {}", entry.key, entry.value);
    }
    Ok(())
}

async fn run_config_set(key: &str, value: &str, db_path: &Path) -> Result<(), CliError> {
    let key = normalize_config_key(key)?;
    let value = normalize_config_value(key, value)?;

    let store = open_store(db_path).await?;
    store.set_config(key, &value).await?;
    println!("Set {key} = {value}");
    Ok(())
}

async fn run_config_unset(key: &str, db_path: &Path) -> Result<(), CliError> {
    let key = normalize_config_key(key)?;
    let store = open_store(db_path).await?;

    if store.delete_config(key).await? {
        println!("Removed {key}");
    } else {
        println!("{key} was not set");
    }
    Ok(())
}
