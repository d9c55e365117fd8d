use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rollcall_core::auth::{actor_from_lookup, Session};
use rollcall_core::config::{AppConfig, ENV_SHEET_NAME, ENV_SPREADSHEET_ID};
use rollcall_core::db::config_keys;
use rollcall_core::services::{CheckinService, LocalStore, OfflineCheckin, Submission};
use rollcall_core::sheets::HttpSheetsTransport;
use rollcall_core::Participant;
use serde::Serialize;

use crate::error::CliError;

/// Actor recorded when `ROLLCALL_ACTOR` is unset
pub const SYSTEM_ACTOR: &str = "system";

pub const ENV_DB_PATH: &str = "ROLLCALL_DB_PATH";

#[derive(Debug, Serialize)]
pub struct ParticipantListItem {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub status: String,
    pub checkin_at: Option<String>,
    pub checkin_by: Option<String>,
    pub relative_time: Option<String>,
    pub audit_note: Option<String>,
    pub row_number: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionItem {
    pub status: &'static str,
    pub participant: Option<ParticipantListItem>,
    pub operation_id: Option<i64>,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("rollcall").join("rollcall.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub async fn open_store(path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(path.to_path_buf()).await?)
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Environment lookup where values stored in the config table win.
pub fn layered_lookup(
    stored: HashMap<String, String>,
    fallback: impl Fn(&str) -> Option<String>,
) -> impl Fn(&str) -> Option<String> {
    move |key| {
        let stored_key = match key {
            ENV_SPREADSHEET_ID => Some(config_keys::SPREADSHEET_ID),
            ENV_SHEET_NAME => Some(config_keys::SHEET_NAME),
            _ => None,
        };
        stored_key
            .and_then(|stored_key| stored.get(stored_key).cloned())
            .or_else(|| fallback(key))
    }
}

pub async fn load_app_config(store: &LocalStore) -> Result<AppConfig, CliError> {
    let stored = store.list_config().await?.into_iter().collect();
    AppConfig::from_lookup(layered_lookup(stored, env_var))?.ok_or(CliError::NotConfigured)
}

/// Wire the configured sheet, the session and the local store together.
pub async fn connect(store: LocalStore) -> Result<OfflineCheckin<HttpSheetsTransport>, CliError> {
    let config = load_app_config(&store).await?;
    let mut client = config.sheets_client()?;

    let actor = match Session::from_lookup(env_var, SYSTEM_ACTOR) {
        Some(session) => {
            session.authorize(&mut client);
            session.user
        }
        None => {
            tracing::debug!("No access token configured; using API key only");
            actor_from_lookup(env_var, SYSTEM_ACTOR)
        }
    };

    let service =
        CheckinService::new(client, actor).with_undo_time_limit(config.undo_time_limit());
    Ok(OfflineCheckin::new(service, store))
}

pub async fn open_checkin(db_path: &Path) -> Result<OfflineCheckin<HttpSheetsTransport>, CliError> {
    connect(open_store(db_path).await?).await
}

pub fn normalize_participant_id(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyParticipantId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_search_name(name: &str) -> Result<String, CliError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchName)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn format_timestamp(date_time: &DateTime<Utc>) -> String {
    date_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

pub fn participant_to_list_item(participant: &Participant, now: DateTime<Utc>) -> ParticipantListItem {
    ParticipantListItem {
        id: participant.id.clone(),
        name: participant.name.clone(),
        email: participant.email.clone(),
        status: participant.checkin_status.to_string(),
        checkin_at: participant.checkin_at.as_ref().map(format_timestamp),
        checkin_by: participant.checkin_by.clone(),
        relative_time: participant.checkin_at.map(|checkin_at| {
            format_relative_time(checkin_at.timestamp_millis(), now.timestamp_millis())
        }),
        audit_note: participant.audit_note.clone(),
        row_number: participant.row_number,
    }
}

pub fn format_participant_line(participant: &Participant, now: DateTime<Utc>) -> String {
    let id = &participant.id;
    let name = &participant.name;
    let mark = if participant.is_checked_in() { "[x]" } else { "[ ]" };

    let detail = match (participant.checkin_at, participant.checkin_by.as_deref()) {
        (Some(checkin_at), by) => {
            let when = format_relative_time(checkin_at.timestamp_millis(), now.timestamp_millis());
            by.map_or_else(|| when.clone(), |by| format!("{when} by {by}"))
        }
        (None, _) => participant.email.clone().unwrap_or_default(),
    };

    if detail.is_empty() {
        format!("{id:<16}  {mark}  {name}")
    } else {
        format!("{id:<16}  {mark}  {name:<24}  {detail}")
    }
}

pub fn format_participant_lines(participants: &[Participant], now: DateTime<Utc>) -> Vec<String> {
    participants
        .iter()
        .map(|participant| format_participant_line(participant, now))
        .collect()
}

pub fn submission_to_item(submission: &Submission, now: DateTime<Utc>) -> SubmissionItem {
    match submission {
        Submission::Applied(participant) => SubmissionItem {
            status: "applied",
            participant: Some(participant_to_list_item(participant, now)),
            operation_id: None,
        },
        Submission::Queued(operation_id) => SubmissionItem {
            status: "queued",
            participant: None,
            operation_id: Some(*operation_id),
        },
    }
}

/// One-line summary; `action` reads like "Checked in".
pub fn format_submission(action: &str, participant_id: &str, submission: &Submission) -> String {
    match submission {
        Submission::Applied(participant) => {
            format!("{action} {} ({})", participant.name, participant.id)
        }
        Submission::Queued(operation_id) => format!(
            "Sheet unreachable; {participant_id} queued as operation {operation_id}. Run `rollcall queue flush` once back online."
        ),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
