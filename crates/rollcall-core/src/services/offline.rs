//! Offline-tolerant front door: retries, queues, snapshot fallback and
//! queue replay around the check-in service.

use chrono::SecondsFormat;
use serde::Serialize;

use super::{CheckinService, LocalStore};
use crate::db::config_keys;
use crate::models::{
    normalize_name_for_search, NewPendingOperation, OperationKind, Participant, ParticipantUpdate,
    PendingOperation,
};
use crate::sheets::SheetsTransport;
use crate::sync::{retry_with_backoff_when, OfflineQueue, OperationProcessor, RetryPolicy};
use crate::{Error, Result};

/// Where a search result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    /// Resolution cache or a live read of the sheet
    Remote,
    /// Durable snapshot from the last successful sync
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub participant: Option<Participant>,
    pub source: SearchSource,
}

/// Fate of a check-in or undo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The sheet confirmed the write
    Applied(Participant),
    /// The sheet was unreachable; the update waits in the offline queue
    Queued(i64),
}

/// Outcome of draining the offline queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub applied: usize,
    pub remaining: u64,
}

/// Check-in operations that keep working while the sheet is unreachable.
pub struct OfflineCheckin<T> {
    service: CheckinService<T>,
    queue: OfflineQueue,
    store: LocalStore,
    retry: RetryPolicy,
}

impl<T: SheetsTransport> OfflineCheckin<T> {
    pub fn new(service: CheckinService<T>, store: LocalStore) -> Self {
        Self {
            service,
            queue: OfflineQueue::new(store.clone()),
            store,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub const fn service(&self) -> &CheckinService<T> {
        &self.service
    }

    pub const fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Search the sheet, falling back to the durable snapshots when the
    /// sheet cannot be reached.
    pub async fn search(&self, name: &str) -> Result<SearchOutcome> {
        match self.service.search_participant(name).await {
            Ok(participant) => {
                if let Some(found) = &participant {
                    self.store.store_participant_snapshot(found).await?;
                }
                Ok(SearchOutcome {
                    participant,
                    source: SearchSource::Remote,
                })
            }
            Err(error) if error.is_retryable() => {
                tracing::warn!("Sheet unreachable ({}); searching local snapshots", error);
                let participant = self
                    .store
                    .find_snapshot_by_name(normalize_name_for_search(name))
                    .await?;
                Ok(SearchOutcome {
                    participant,
                    source: SearchSource::Snapshot,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Re-read every participant and replace the durable snapshots.
    pub async fn refresh_snapshots(&self) -> Result<usize> {
        let client = self.service.client();
        let participants = retry_with_backoff_when(
            &self.retry,
            move || client.read_participants(None),
            Error::is_retryable,
            |attempt, error| tracing::warn!("Participant read failed (retry {}): {}", attempt, error),
        )
        .await?;

        self.store
            .replace_participant_snapshots(&participants)
            .await?;
        let synced_at = self.service.now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.store
            .set_config(config_keys::LAST_SYNCED_AT, &synced_at)
            .await?;

        tracing::info!("Cached {} participant snapshots", participants.len());
        Ok(participants.len())
    }

    pub async fn checkin(&self, participant_id: &str) -> Result<Submission> {
        let update = self.service.checkin_update(participant_id);
        self.submit(OperationKind::Checkin, update).await
    }

    pub async fn undo(&self, participant_id: &str, reason: &str) -> Result<Submission> {
        let update = self.service.undo_update(participant_id, reason);
        self.submit(OperationKind::UndoCheckin, update).await
    }

    async fn submit(&self, kind: OperationKind, update: ParticipantUpdate) -> Result<Submission> {
        let service = &self.service;
        let pending = &update;
        let result = retry_with_backoff_when(
            &self.retry,
            move || service.commit_update(pending),
            Error::is_retryable,
            |attempt, error| {
                tracing::warn!(
                    "{} for {} failed (retry {}): {}",
                    kind,
                    pending.participant_id,
                    attempt,
                    error
                );
            },
        )
        .await;

        match result {
            Ok(participant) => {
                self.store.store_participant_snapshot(&participant).await?;
                Ok(Submission::Applied(participant))
            }
            Err(error) if error.is_retryable() => {
                let id = self
                    .queue
                    .add_to_queue(NewPendingOperation::new(kind, update))
                    .await?;
                Ok(Submission::Queued(id))
            }
            Err(error) => Err(error),
        }
    }

    /// Replay queued updates oldest first until the queue is empty or the
    /// sheet becomes unreachable again.
    pub async fn replay(&self) -> Result<ReplayReport> {
        let mut replayer = Replayer {
            service: &self.service,
            store: &self.store,
        };
        let run = self.queue.process_queue(&mut replayer).await?;
        let remaining = self.queue.len().await?;

        if let Some(error) = &run.interrupted_by {
            tracing::warn!("Replay stopped with {} operations left: {}", remaining, error);
        }
        Ok(ReplayReport {
            applied: run.applied,
            remaining,
        })
    }
}

struct Replayer<'a, T> {
    service: &'a CheckinService<T>,
    store: &'a LocalStore,
}

impl<T: SheetsTransport> OperationProcessor for Replayer<'_, T> {
    async fn process(&mut self, operation: &PendingOperation) -> Result<()> {
        let participant = self.service.apply_update(&operation.payload).await?;
        self.store.store_participant_snapshot(&participant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckinStatus, User};
    use crate::sheets::{SheetsClient, DEFAULT_SHEET_NAME};
    use crate::testing::{at, grid, FakeSheets, Failure, ManualClock};
    use chrono::TimeDelta;
    use std::sync::Arc;
    use std::time::Duration;

    fn sheet() -> FakeSheets {
        FakeSheets::new(grid(&[
            &[
                "name",
                "_participant_id",
                "_checkin_status",
                "_checkin_at",
                "_checkin_by",
                "_updated_at",
                "_updated_by",
                "_audit_note",
            ],
            &["田中太郎", "p001", "", "", "", "", "", ""],
            &["山田花子", "p002", "", "", "", "", "", ""],
        ]))
    }

    async fn offline_checkin(
        fake: &FakeSheets,
        clock: &Arc<ManualClock>,
    ) -> OfflineCheckin<FakeSheets> {
        let client = SheetsClient::new("sheet-123", DEFAULT_SHEET_NAME, fake.clone());
        let service = CheckinService::new(client, User::from_email("staff@example.com"))
            .with_clock(clock.clone());
        let store = LocalStore::open_in_memory().await.unwrap();
        OfflineCheckin::new(service, store).with_retry_policy(RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 2,
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transient_failures_are_retried_before_applying() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        fake.fail_times(Failure::Timeout, 2);
        let submission = offline.checkin("p001").await.unwrap();

        assert!(matches!(submission, Submission::Applied(ref p) if p.is_checked_in()));
        assert!(offline.queue().is_empty().await.unwrap());
        assert!(offline
            .store()
            .participant_snapshot("p001")
            .await
            .unwrap()
            .unwrap()
            .is_checked_in());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_sheet_queues_then_replay_applies() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        fake.set_offline(true);
        let submission = offline.checkin("p001").await.unwrap();
        let Submission::Queued(op_id) = submission else {
            panic!("expected a queued submission, got {submission:?}");
        };
        let queued = offline.queue().queued_operations().await.unwrap();
        assert_eq!(queued[0].id, op_id);
        assert_eq!(queued[0].kind, OperationKind::Checkin);
        assert_eq!(fake.write_count(), 0);

        let stalled = offline.replay().await.unwrap();
        assert_eq!(stalled, ReplayReport { applied: 0, remaining: 1 });

        fake.set_offline(false);
        clock.advance(TimeDelta::minutes(10));
        let report = offline.replay().await.unwrap();
        assert_eq!(report, ReplayReport { applied: 1, remaining: 0 });
        assert_eq!(fake.row(2)[2], "checked_in");
        assert_eq!(fake.row(2)[3], "2024-01-10T09:00:00.000Z", "desk time is kept");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_errors_surface_without_queueing() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        fake.fail_next_write(Failure::Transport);
        let error = offline.checkin("p001").await.unwrap_err();

        assert!(matches!(error, Error::Transport(_)));
        assert!(!error.is_retryable());
        assert_eq!(offline.queue().len().await.unwrap(), 0);
        assert_eq!(fake.write_count(), 0);
        assert!(fake.row(2)[2].is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn business_rule_failures_are_not_queued() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        offline.checkin("p001").await.unwrap();
        let error = offline.checkin("p001").await.unwrap_err();
        assert!(matches!(error, Error::AlreadyCheckedIn(_)));

        let error = offline.undo("p002", "").await.unwrap_err();
        assert!(matches!(error, Error::NotCheckedIn(_)));
        assert!(offline.queue().is_empty().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn replay_preserves_checkin_then_undo_order() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        fake.set_offline(true);
        offline.checkin("p002").await.unwrap();
        clock.advance(TimeDelta::minutes(1));
        offline.undo("p002", "wrong person").await.unwrap();
        assert_eq!(offline.queue().len().await.unwrap(), 2);

        fake.set_offline(false);
        let report = offline.replay().await.unwrap();
        assert_eq!(report.applied, 2);
        let row = fake.row(3);
        assert_eq!(row[2], "not_checked_in");
        assert!(row[7].starts_with("Check-in undone: wrong person"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn search_falls_back_to_snapshots_when_offline() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        assert_eq!(offline.refresh_snapshots().await.unwrap(), 2);
        assert_eq!(
            offline
                .store()
                .get_config(config_keys::LAST_SYNCED_AT)
                .await
                .unwrap()
                .as_deref(),
            Some("2024-01-10T09:00:00.000Z")
        );

        fake.set_offline(true);
        let outcome = offline.search(" 山田花子 ").await.unwrap();
        assert_eq!(outcome.source, SearchSource::Snapshot);
        assert_eq!(outcome.participant.unwrap().id, "p002");

        let missing = offline.search("佐藤次郎").await.unwrap();
        assert_eq!(missing.participant, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshot_search_trims_sheet_names_like_remote_search() {
        let fake = FakeSheets::new(grid(&[
            &["name", "_participant_id", "_checkin_status"],
            &["田中太郎 ", "p001", ""],
        ]));
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        let remote = offline.search("田中太郎").await.unwrap();
        assert_eq!(remote.participant.unwrap().id, "p001");

        offline.refresh_snapshots().await.unwrap();
        offline.service().clear_cache().await;
        fake.set_offline(true);

        let snapshot = offline.search("田中太郎").await.unwrap();
        assert_eq!(snapshot.source, SearchSource::Snapshot);
        assert_eq!(snapshot.participant.unwrap().id, "p001");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_search_reports_its_source() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        let outcome = offline.search("田中太郎").await.unwrap();
        assert_eq!(outcome.source, SearchSource::Remote);
        assert_eq!(
            outcome.participant.unwrap().checkin_status,
            CheckinStatus::NotCheckedIn
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn auth_failures_propagate_from_searches() {
        let fake = sheet();
        let clock = ManualClock::new(at("2024-01-10T09:00:00Z"));
        let offline = offline_checkin(&fake, &clock).await;

        fake.fail_next(Failure::Auth);
        assert!(matches!(offline.search("田中太郎").await, Err(Error::Auth(_))));
    }
}
