//! Pending operation log repository implementation

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{NewPendingOperation, PendingOperation};

/// Trait for the durable pending-operation log (async)
#[allow(async_fn_in_trait)]
pub trait PendingOperationRepository {
    /// Append an operation and return its assigned id
    async fn insert(&self, operation: &NewPendingOperation, created_at: i64) -> Result<i64>;

    /// All operations, oldest first
    async fn list_ordered(&self) -> Result<Vec<PendingOperation>>;

    /// Remove a confirmed operation; returns whether a row was deleted
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Number of queued operations
    async fn count(&self) -> Result<u64>;
}

/// libSQL implementation of `PendingOperationRepository`
pub struct LibSqlPendingOperationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPendingOperationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_operation(row: &libsql::Row) -> Result<PendingOperation> {
        let kind = row
            .get::<String>(1)?
            .parse()
            .map_err(Error::Database)?;
        let payload = serde_json::from_str(&row.get::<String>(2)?)?;

        Ok(PendingOperation {
            id: row.get(0)?,
            kind,
            payload,
            created_at: row.get(3)?,
        })
    }
}

impl PendingOperationRepository for LibSqlPendingOperationRepository<'_> {
    async fn insert(&self, operation: &NewPendingOperation, created_at: i64) -> Result<i64> {
        let payload = serde_json::to_string(&operation.payload)?;
        self.conn
            .execute(
                "INSERT INTO pending_operations (op_type, payload, created_at) VALUES (?, ?, ?)",
                params![operation.kind.as_str(), payload, created_at],
            )
            .await?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn list_ordered(&self) -> Result<Vec<PendingOperation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, op_type, payload, created_at
                 FROM pending_operations
                 ORDER BY created_at ASC, id ASC",
                (),
            )
            .await?;

        let mut operations = Vec::new();
        while let Some(row) = rows.next().await? {
            operations.push(Self::parse_operation(&row)?);
        }
        Ok(operations)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM pending_operations WHERE id = ?", [id])
            .await?;
        Ok(deleted > 0)
    }

    async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM pending_operations", ())
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        u64::try_from(count).map_err(|_| Error::Database(format!("invalid count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{CheckinStatus, OperationKind, ParticipantUpdate};
    use chrono::{DateTime, Utc};

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn operation(participant_id: &str) -> NewPendingOperation {
        NewPendingOperation::new(
            OperationKind::Checkin,
            ParticipantUpdate {
                participant_id: participant_id.into(),
                checkin_status: CheckinStatus::CheckedIn,
                checkin_at: Some(DateTime::<Utc>::UNIX_EPOCH),
                checkin_by: Some("staff@example.com".into()),
                audit_note: None,
                undo_reason: None,
                requested_by: "staff@example.com".into(),
                requested_at: DateTime::<Utc>::UNIX_EPOCH,
            },
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_assigns_monotonic_ids() {
        let db = setup().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());

        let first = repo.insert(&operation("a"), 10).await.unwrap();
        let second = repo.insert(&operation("b"), 20).await.unwrap();
        assert!(second > first);

        // AUTOINCREMENT never reuses a deleted id
        repo.delete(second).await.unwrap();
        let third = repo.insert(&operation("c"), 30).await.unwrap();
        assert!(third > second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_orders_by_created_at() {
        let db = setup().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());

        repo.insert(&operation("late"), 300).await.unwrap();
        repo.insert(&operation("early"), 100).await.unwrap();
        repo.insert(&operation("middle"), 200).await.unwrap();

        let ids: Vec<_> = repo
            .list_ordered()
            .await
            .unwrap()
            .into_iter()
            .map(|op| op.payload.participant_id)
            .collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_and_count() {
        let db = setup().await;
        let repo = LibSqlPendingOperationRepository::new(db.connection());

        let id = repo.insert(&operation("a"), 1).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
