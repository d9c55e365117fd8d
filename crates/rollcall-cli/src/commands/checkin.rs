use std::path::Path;

use crate::commands::common::{
    format_submission, normalize_participant_id, open_checkin, print_json, submission_to_item,
};
use crate::error::CliError;

pub async fn run_checkin(id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let id = normalize_participant_id(id)?;
    let app = open_checkin(db_path).await?;
    let submission = app.checkin(&id).await?;

    if as_json {
        print_json(&submission_to_item(&submission, app.service().now()))
    } else {
        println!("{}", format_submission("Checked in", &id, &submission));
        Ok(())
    }
}
