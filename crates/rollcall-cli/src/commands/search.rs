use std::path::Path;

use rollcall_core::services::{SearchOutcome, SearchSource};
use serde::Serialize;

use crate::commands::common::{
    format_participant_line, normalize_search_name, open_checkin, participant_to_list_item,
    print_json, ParticipantListItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub source: SearchSource,
    pub participant: Option<ParticipantListItem>,
    pub can_undo: bool,
}

pub async fn run_search(name: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let name = normalize_search_name(name)?;
    let app = open_checkin(db_path).await?;
    let SearchOutcome {
        participant,
        source,
    } = app.search(&name).await?;

    let now = app.service().now();
    let can_undo = participant
        .as_ref()
        .is_some_and(|found| app.service().can_undo(found));

    if as_json {
        return print_json(&SearchResultItem {
            source,
            participant: participant
                .as_ref()
                .map(|found| participant_to_list_item(found, now)),
            can_undo,
        });
    }

    match participant {
        Some(found) => {
            println!("{}", format_participant_line(&found, now));
            if can_undo {
                println!("Check-in can still be undone");
            }
        }
        None => println!("No participant named '{name}'"),
    }
    if source == SearchSource::Snapshot {
        println!("(sheet unreachable; result from local snapshot)");
    }

    Ok(())
}
