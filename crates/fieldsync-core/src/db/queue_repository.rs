//! Sync queue repository implementation

use crate::error::{Error, Result};
use crate::models::{EntryId, SyncQueueEntry};
use libsql::{params, Connection, Row};

/// Trait for sync queue storage operations (async)
#[allow(async_fn_in_trait)]
pub trait QueueRepository {
    /// Insert a new entry
    async fn insert(&self, entry: &SyncQueueEntry) -> Result<()>;

    /// Get an entry by ID
    async fn get(&self, id: &EntryId) -> Result<Option<SyncQueueEntry>>;

    /// List all readable entries, oldest first. Unreadable rows are skipped.
    async fn list(&self) -> Result<Vec<SyncQueueEntry>>;

    /// Record a failed delivery in place, keeping `id` and `created_at`
    async fn record_failure(&self, id: &EntryId, attempts: u32, last_error: &str) -> Result<()>;

    /// Reset attempts and last error so the entry becomes eligible again
    async fn reset_attempts(&self, id: &EntryId) -> Result<()>;

    /// Delete an entry; returns whether a row existed
    async fn delete(&self, id: &EntryId) -> Result<bool>;

    /// Delete a row by its stored key, even if the row cannot be parsed
    async fn delete_key(&self, key: &str) -> Result<bool>;

    /// Delete every entry; returns the number removed
    async fn clear(&self) -> Result<u64>;

    /// Count entries
    async fn count(&self) -> Result<usize>;
}

/// libSQL implementation of `QueueRepository`
pub struct LibSqlQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an entry from a database row
    fn parse_entry(row: &Row) -> Result<SyncQueueEntry> {
        let id: String = row.get(0)?;
        let payload: String = row.get(2)?;
        let meta: Option<String> = row.get(3)?;
        let attempts: i64 = row.get(5)?;

        Ok(SyncQueueEntry {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid queue entry ID: {id}")))?,
            operation_type: row.get(1)?,
            payload: serde_json::from_str(&payload)?,
            meta: meta.map(|raw| serde_json::from_str(&raw)).transpose()?,
            created_at: row.get(4)?,
            attempts: u32::try_from(attempts).map_err(|_| {
                Error::InvalidInput(format!("Invalid attempt count for {id}: {attempts}"))
            })?,
            last_error: row.get(6)?,
        })
    }
}

impl QueueRepository for LibSqlQueueRepository<'_> {
    async fn insert(&self, entry: &SyncQueueEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.payload)?;
        let meta = entry.meta.as_ref().map(serde_json::to_string).transpose()?;

        self.conn
            .execute(
                "INSERT INTO sync_queue (id, type, payload, meta, created_at, attempts, last_error)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.id.as_str(),
                    entry.operation_type.as_str(),
                    payload,
                    meta,
                    entry.created_at,
                    i64::from(entry.attempts),
                    entry.last_error.clone()
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &EntryId) -> Result<Option<SyncQueueEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, type, payload, meta, created_at, attempts, last_error
                 FROM sync_queue WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<SyncQueueEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, type, payload, meta, created_at, attempts, last_error
                 FROM sync_queue
                 ORDER BY created_at ASC, id ASC",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            match Self::parse_entry(&row) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    let key = row.get::<String>(0).unwrap_or_default();
                    tracing::warn!("Skipping unreadable queue entry '{key}': {error}");
                }
            }
        }
        Ok(entries)
    }

    async fn record_failure(&self, id: &EntryId, attempts: u32, last_error: &str) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE sync_queue SET attempts = ?, last_error = ? WHERE id = ?",
                params![i64::from(attempts), last_error, id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn reset_attempts(&self, id: &EntryId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE sync_queue SET attempts = 0, last_error = NULL WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<bool> {
        self.delete_key(&id.as_str()).await
    }

    async fn delete_key(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM sync_queue WHERE id = ?", [key])
            .await?;
        Ok(rows > 0)
    }

    async fn clear(&self) -> Result<u64> {
        Ok(self.conn.execute("DELETE FROM sync_queue", ()).await?)
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM sync_queue", ())
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }
}
