//! Participant snapshot repository implementation

use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{normalize_name_for_search, CheckinStatus, Participant};

const SELECT_COLUMNS: &str = "id, name, email, checkin_status, checkin_at, checkin_by, \
     updated_at, updated_by, audit_note, row_number";

/// Trait for the local participant snapshot cache (async)
#[allow(async_fn_in_trait)]
pub trait ParticipantRepository {
    /// Replace every snapshot with the given set in one transaction
    async fn replace_all(&self, participants: &[Participant], cached_at: i64) -> Result<()>;

    /// Insert or overwrite a single snapshot
    async fn upsert(&self, participant: &Participant, cached_at: i64) -> Result<()>;

    /// Get a snapshot by participant id
    async fn get(&self, id: &str) -> Result<Option<Participant>>;

    /// First snapshot whose trimmed name matches exactly, in sheet row order
    async fn find_by_name(&self, name: &str) -> Result<Option<Participant>>;

    /// All snapshots in sheet row order
    async fn list(&self) -> Result<Vec<Participant>>;
}

/// libSQL implementation of `ParticipantRepository`
pub struct LibSqlParticipantRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlParticipantRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn insert(&self, participant: &Participant, cached_at: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO participants (
                    id, name, search_name, email, checkin_status, checkin_at, checkin_by,
                    updated_at, updated_by, audit_note, row_number, cached_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    participant.id.as_str(),
                    participant.name.as_str(),
                    participant.search_key(),
                    participant.email.clone(),
                    participant.checkin_status.as_wire(),
                    participant.checkin_at.map(|at| at.to_rfc3339()),
                    participant.checkin_by.clone(),
                    participant.updated_at.map(|at| at.to_rfc3339()),
                    participant.updated_by.clone(),
                    participant.audit_note.clone(),
                    participant.row_number.map(i64::from),
                    cached_at
                ],
            )
            .await?;
        Ok(())
    }

    fn parse_participant(row: &libsql::Row) -> Result<Participant> {
        let row_number = row
            .get::<Option<i64>>(9)?
            .map(|value| {
                u32::try_from(value)
                    .map_err(|_| Error::Database(format!("invalid row_number {value}")))
            })
            .transpose()?;

        Ok(Participant {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            checkin_status: CheckinStatus::from_wire(&row.get::<String>(3)?),
            checkin_at: parse_timestamp(row.get(4)?)?,
            checkin_by: row.get(5)?,
            updated_at: parse_timestamp(row.get(6)?)?,
            updated_by: row.get(7)?,
            audit_note: row.get(8)?,
            row_number,
        })
    }

    async fn query_participants(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Participant>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut participants = Vec::new();
        while let Some(row) = rows.next().await? {
            participants.push(Self::parse_participant(&row)?);
        }
        Ok(participants)
    }
}

fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|error| Error::Database(format!("invalid timestamp '{raw}': {error}")))
        })
        .transpose()
}

impl ParticipantRepository for LibSqlParticipantRepository<'_> {
    async fn replace_all(&self, participants: &[Participant], cached_at: i64) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        if let Err(e) = self.conn.execute("DELETE FROM participants", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        for participant in participants {
            if let Err(e) = self.insert(participant, cached_at).await {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(())
    }

    async fn upsert(&self, participant: &Participant, cached_at: i64) -> Result<()> {
        self.insert(participant, cached_at).await
    }

    async fn get(&self, id: &str) -> Result<Option<Participant>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM participants WHERE id = ?");
        Ok(self.query_participants(&sql, [id]).await?.into_iter().next())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Participant>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM participants
             WHERE search_name = ?
             ORDER BY row_number IS NULL, row_number ASC
             LIMIT 1"
        );
        let name = normalize_name_for_search(name);
        Ok(self.query_participants(&sql, [name]).await?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Participant>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM participants
             ORDER BY row_number IS NULL, row_number ASC, id ASC"
        );
        self.query_participants(&sql, ()).await
    }
}
