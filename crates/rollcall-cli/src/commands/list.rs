use std::path::Path;

use chrono::Utc;
use rollcall_core::db::config_keys;
use serde::Serialize;

use crate::commands::common::{
    connect, format_participant_lines, open_store, participant_to_list_item, print_json,
    ParticipantListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SnapshotListing {
    pub last_synced_at: Option<String>,
    pub stale: bool,
    pub participants: Vec<ParticipantListItem>,
}

pub async fn run_list(offline: bool, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;

    let mut stale = offline;
    if !offline {
        let app = connect(store.clone()).await?;
        match app.refresh_snapshots().await {
            Ok(count) => tracing::debug!("Refreshed {} snapshots", count),
            Err(error) if error.is_retryable() => {
                eprintln!("Sheet unreachable ({error}); showing cached snapshots");
                stale = true;
            }
            Err(error) => return Err(error.into()),
        }
    }

    let participants = store.list_participant_snapshots().await?;
    let last_synced_at = store.get_config(config_keys::LAST_SYNCED_AT).await?;
    let now = Utc::now();

    if as_json {
        return print_json(&SnapshotListing {
            last_synced_at,
            stale,
            participants: participants
                .iter()
                .map(|participant| participant_to_list_item(participant, now))
                .collect(),
        });
    }

    for line in format_participant_lines(&participants, now) {
        println!("{line}");
    }
    let checked_in = participants
        .iter()
        .filter(|participant| participant.is_checked_in())
        .count();
    println!("{checked_in}/{} checked in", participants.len());
    if stale {
        println!(
            "Last synced: {}",
            last_synced_at.as_deref().unwrap_or("never")
        );
    }

    Ok(())
}
