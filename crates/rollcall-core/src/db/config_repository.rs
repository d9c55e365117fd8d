//! Config table repository implementation

use crate::error::Result;
use libsql::Connection;

/// Keys persisted in the local config table
pub mod keys {
    pub const SPREADSHEET_ID: &str = "spreadsheet_id";
    pub const SHEET_NAME: &str = "sheet_name";
    pub const LAST_SYNCED_AT: &str = "last_synced_at";

    /// Keys an operator may set from the CLI
    pub const EDITABLE: [&str; 2] = [SPREADSHEET_ID, SHEET_NAME];
}

/// Trait for the string-keyed config table (async)
#[allow(async_fn_in_trait)]
pub trait ConfigRepository {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All entries ordered by key
    async fn list(&self) -> Result<Vec<(String, String)>>;
}

/// libSQL implementation of `ConfigRepository`
pub struct LibSqlConfigRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConfigRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ConfigRepository for LibSqlConfigRepository<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM config WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO config (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM config WHERE key = ?", [key])
            .await?;
        Ok(deleted > 0)
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        let mut rows = self
            .conn
            .query("SELECT key, value FROM config ORDER BY key ASC", ())
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push((row.get(0)?, row.get(1)?));
        }
        Ok(entries)
    }
}
