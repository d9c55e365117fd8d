//! Check-in and undo against the sheet, with exactly-once and undo-window
//! guards.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use tokio::sync::Mutex;

use super::ResolutionCache;
use crate::models::{normalize_name_for_search, CheckinStatus, Participant, ParticipantUpdate, User};
use crate::sheets::{SheetsClient, SheetsTransport};
use crate::util::{Clock, SystemClock};
use crate::{Error, Result};

/// How long after a check-in it may still be undone
pub const DEFAULT_UNDO_TIME_LIMIT_MS: i64 = 5 * 60 * 1000;

/// Reason recorded when an undo gives none
pub const DEFAULT_UNDO_REASON: &str = "operator request";

/// Whether a check-in made at `participant.checkin_at` may still be undone at
/// `now`. The boundary itself is inside the window.
pub fn can_undo_at(participant: &Participant, now: DateTime<Utc>, limit: TimeDelta) -> bool {
    participant
        .checkin_at
        .is_some_and(|checkin_at| now - checkin_at <= limit)
}

/// Orchestrates search, check-in and undo for one acting user.
///
/// Every mutation re-reads the sheet before writing. The resolution cache is
/// only updated after the sheet confirms a write.
pub struct CheckinService<T> {
    client: SheetsClient<T>,
    cache: Mutex<ResolutionCache>,
    actor: User,
    clock: Arc<dyn Clock>,
    undo_time_limit: TimeDelta,
}

impl<T: SheetsTransport> CheckinService<T> {
    pub fn new(client: SheetsClient<T>, actor: User) -> Self {
        Self {
            client,
            cache: Mutex::new(ResolutionCache::new()),
            actor,
            clock: Arc::new(SystemClock),
            undo_time_limit: TimeDelta::milliseconds(DEFAULT_UNDO_TIME_LIMIT_MS),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_undo_time_limit(mut self, limit: TimeDelta) -> Self {
        self.undo_time_limit = limit;
        self
    }

    pub const fn client(&self) -> &SheetsClient<T> {
        &self.client
    }

    /// Cached snapshot for a name, without touching the sheet.
    pub async fn cached(&self, name: &str) -> Option<Participant> {
        self.cache.lock().await.get(name).cloned()
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    pub const fn actor(&self) -> &User {
        &self.actor
    }

    pub const fn undo_time_limit(&self) -> TimeDelta {
        self.undo_time_limit
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Find a participant by exact name, cache first.
    ///
    /// Only surrounding whitespace is ignored. When several rows share a
    /// name the first one in sheet order wins.
    pub async fn search_participant(&self, name: &str) -> Result<Option<Participant>> {
        let name = normalize_name_for_search(name);
        if name.is_empty() {
            return Err(Error::InvalidInput("search name must not be empty".into()));
        }

        if let Some(cached) = self.cached(name).await {
            tracing::debug!("Resolution cache hit for '{}'", name);
            return Ok(Some(cached));
        }

        tracing::debug!("Resolution cache miss for '{}'; reading sheet", name);
        let found = self
            .client
            .read_participants(None)
            .await?
            .into_iter()
            .find(|participant| participant.search_key() == name);

        if let Some(participant) = &found {
            self.cache.lock().await.refresh(participant.clone());
        }
        Ok(found)
    }

    /// Whether the participant's check-in is still inside the undo window.
    pub fn can_undo(&self, participant: &Participant) -> bool {
        can_undo_at(participant, self.now(), self.undo_time_limit)
    }

    /// The update a check-in by the current actor would apply right now.
    pub fn checkin_update(&self, participant_id: &str) -> ParticipantUpdate {
        let now = self.now();
        let actor = self.actor.actor_id().to_string();
        ParticipantUpdate {
            participant_id: participant_id.to_string(),
            checkin_status: CheckinStatus::CheckedIn,
            checkin_at: Some(now),
            checkin_by: Some(actor.clone()),
            audit_note: Some(format!("Checked in - {} by {actor}", format_audit_time(now))),
            undo_reason: None,
            requested_by: actor,
            requested_at: now,
        }
    }

    /// The update an undo by the current actor would apply right now.
    pub fn undo_update(&self, participant_id: &str, reason: &str) -> ParticipantUpdate {
        let now = self.now();
        let actor = self.actor.actor_id().to_string();
        let reason = match reason.trim() {
            "" => DEFAULT_UNDO_REASON,
            reason => reason,
        };
        ParticipantUpdate {
            participant_id: participant_id.to_string(),
            checkin_status: CheckinStatus::NotCheckedIn,
            checkin_at: None,
            checkin_by: None,
            audit_note: Some(format!(
                "Check-in undone: {reason} - {} by {actor}",
                format_audit_time(now)
            )),
            undo_reason: Some(reason.to_string()),
            requested_by: actor,
            requested_at: now,
        }
    }

    /// Check a participant in. A second check-in is rejected.
    pub async fn checkin_participant(&self, participant_id: &str) -> Result<Participant> {
        self.commit_update(&self.checkin_update(participant_id))
            .await
    }

    /// Revert a check-in made within the undo window.
    pub async fn undo_checkin(&self, participant_id: &str) -> Result<Participant> {
        self.undo_checkin_with_reason(participant_id, DEFAULT_UNDO_REASON)
            .await
    }

    pub async fn undo_checkin_with_reason(
        &self,
        participant_id: &str,
        reason: &str,
    ) -> Result<Participant> {
        self.commit_update(&self.undo_update(participant_id, reason))
            .await
    }

    /// Apply an update built by [`Self::checkin_update`] or
    /// [`Self::undo_update`]. A transition to the status the row already
    /// holds is rejected.
    pub async fn commit_update(&self, update: &ParticipantUpdate) -> Result<Participant> {
        self.transition(update, false).await
    }

    /// Re-apply a recorded update, typically from the offline queue.
    ///
    /// A row that already holds the target status is left untouched and
    /// counts as applied. An undo is judged against the time it was
    /// requested, not the time it is replayed.
    pub async fn apply_update(&self, update: &ParticipantUpdate) -> Result<Participant> {
        self.transition(update, true).await
    }

    async fn transition(&self, update: &ParticipantUpdate, replay: bool) -> Result<Participant> {
        let current = self.fresh_participant(&update.participant_id).await?;

        if current.checkin_status == update.checkin_status {
            if replay {
                tracing::info!(
                    "Participant {} is already {}; nothing to replay",
                    current.id,
                    current.checkin_status
                );
                return Ok(current);
            }
            return Err(match update.checkin_status {
                CheckinStatus::CheckedIn => Error::AlreadyCheckedIn(current.id),
                CheckinStatus::NotCheckedIn => Error::NotCheckedIn(current.id),
            });
        }

        let updated = match update.checkin_status {
            CheckinStatus::CheckedIn => Participant {
                checkin_status: CheckinStatus::CheckedIn,
                checkin_at: Some(update.checkin_at.unwrap_or(update.requested_at)),
                checkin_by: update
                    .checkin_by
                    .clone()
                    .or_else(|| Some(update.requested_by.clone())),
                ..current
            },
            CheckinStatus::NotCheckedIn => {
                let reference = if replay { update.requested_at } else { self.now() };
                self.ensure_undo_window(&current, reference)?;
                Participant {
                    checkin_status: CheckinStatus::NotCheckedIn,
                    checkin_at: None,
                    checkin_by: None,
                    ..current
                }
            }
        };
        let updated = Participant {
            updated_at: Some(self.now()),
            updated_by: Some(update.requested_by.clone()),
            audit_note: update.audit_note.clone(),
            ..updated
        };

        self.client.update_participant(&updated).await?;
        tracing::info!(
            "Participant {} is now {} (by {})",
            updated.id,
            updated.checkin_status,
            update.requested_by
        );
        self.cache.lock().await.record_write(&updated);
        Ok(updated)
    }

    fn ensure_undo_window(&self, participant: &Participant, reference: DateTime<Utc>) -> Result<()> {
        let checkin_at = participant.checkin_at.ok_or_else(|| {
            Error::PreconditionFailed(format!(
                "participant {} is checked in without a check-in time",
                participant.id
            ))
        })?;

        let elapsed = reference - checkin_at;
        if elapsed > self.undo_time_limit {
            return Err(Error::UndoExpired {
                participant_id: participant.id.clone(),
                elapsed_ms: elapsed.num_milliseconds(),
                limit_ms: self.undo_time_limit.num_milliseconds(),
            });
        }
        Ok(())
    }

    async fn fresh_participant(&self, participant_id: &str) -> Result<Participant> {
        self.client
            .read_participants(None)
            .await?
            .into_iter()
            .find(|participant| participant.id == participant_id)
            .ok_or_else(|| Error::NotFound(participant_id.to_string()))
    }
}

fn format_audit_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
