//! Shared local store service wrapping the durable collections.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    ConfigRepository, Database, LibSqlConfigRepository, LibSqlParticipantRepository,
    LibSqlPendingOperationRepository, ParticipantRepository, PendingOperationRepository,
};
use crate::models::{NewPendingOperation, Participant, PendingOperation};
use crate::Result;

/// Process-wide handle to the participant snapshots, pending-operation log,
/// and config table. Clones share one connection.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open a local store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory local store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Backing file, if any.
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Replace the participant snapshot cache with a fresh read.
    pub async fn replace_participant_snapshots(&self, participants: &[Participant]) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlParticipantRepository::new(db.connection());
        repo.replace_all(participants, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Overwrite a single snapshot after a confirmed write.
    pub async fn store_participant_snapshot(&self, participant: &Participant) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlParticipantRepository::new(db.connection());
        repo.upsert(participant, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Fetch a snapshot by participant id.
    pub async fn participant_snapshot(&self, id: &str) -> Result<Option<Participant>> {
        let db = self.db.lock().await;
        let repo = LibSqlParticipantRepository::new(db.connection());
        repo.get(id).await
    }

    /// First snapshot with an exactly matching name, in sheet row order.
    pub async fn find_snapshot_by_name(&self, name: &str) -> Result<Option<Participant>> {
        let db = self.db.lock().await;
        let repo = LibSqlParticipantRepository::new(db.connection());
        repo.find_by_name(name).await
    }

    /// List all snapshots in sheet row order.
    pub async fn list_participant_snapshots(&self) -> Result<Vec<Participant>> {
        let db = self.db.lock().await;
        let repo = LibSqlParticipantRepository::new(db.connection());
        repo.list().await
    }

    /// Append to the pending-operation log.
    pub async fn insert_pending_operation(
        &self,
        operation: &NewPendingOperation,
        created_at: i64,
    ) -> Result<i64> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.insert(operation, created_at).await
    }

    /// Pending operations, oldest first.
    pub async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.list_ordered().await
    }

    /// Number of pending operations.
    pub async fn count_pending_operations(&self) -> Result<u64> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.count().await
    }

    /// Deletion is reserved for the offline queue once a write is confirmed.
    pub(crate) async fn delete_pending_operation(&self, id: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());
        repo.delete(id).await
    }

    /// Read a config value.
    pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let repo = LibSqlConfigRepository::new(db.connection());
        repo.get(key).await
    }

    /// Write a config value.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlConfigRepository::new(db.connection());
        repo.set(key, value).await
    }

    /// Remove a config value.
    pub async fn delete_config(&self, key: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlConfigRepository::new(db.connection());
        repo.delete(key).await
    }

    /// All config entries ordered by key.
    pub async fn list_config(&self) -> Result<Vec<(String, String)>> {
        let db = self.db.lock().await;
        let repo = LibSqlConfigRepository::new(db.connection());
        repo.list().await
    }
}
