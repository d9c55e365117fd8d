use std::path::Path;

use rollcall_core::services::DEFAULT_UNDO_REASON;

use crate::commands::common::{
    format_submission, normalize_participant_id, open_checkin, print_json, submission_to_item,
};
use crate::error::CliError;

pub async fn run_undo(
    id: &str,
    reason: Option<&str>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let id = normalize_participant_id(id)?;
    let reason = reason
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .unwrap_or(DEFAULT_UNDO_REASON);

    let app = open_checkin(db_path).await?;
    let submission = app.undo(&id, reason).await?;

    if as_json {
        print_json(&submission_to_item(&submission, app.service().now()))
    } else {
        println!("{}", format_submission("Undid check-in for", &id, &submission));
        Ok(())
    }
}
