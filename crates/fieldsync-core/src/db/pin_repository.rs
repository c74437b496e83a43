//! Pinned entity repository implementation

use crate::error::Result;
use crate::models::PinnedEntity;
use libsql::{params, Connection, Row};

/// Trait for pinned entity storage operations (async)
#[allow(async_fn_in_trait)]
pub trait PinRepository {
    /// Insert or overwrite a pin
    async fn put(&self, pin: &PinnedEntity) -> Result<()>;

    /// Get a pin by entity id
    async fn get(&self, entity_id: &str) -> Result<Option<PinnedEntity>>;

    /// List all pins, most recently updated first
    async fn list(&self) -> Result<Vec<PinnedEntity>>;

    /// Delete a pin; returns whether a row existed
    async fn delete(&self, entity_id: &str) -> Result<bool>;

    /// Delete every pin
    async fn clear(&self) -> Result<()>;

    /// Count pins
    async fn count(&self) -> Result<usize>;
}

/// libSQL implementation of `PinRepository`
pub struct LibSqlPinRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPinRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_pin(row: &Row) -> Result<PinnedEntity> {
        let data: Option<String> = row.get(1)?;
        Ok(PinnedEntity {
            entity_id: row.get(0)?,
            snapshot_data: data.map(|raw| serde_json::from_str(&raw)).transpose()?,
            pinned_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

impl PinRepository for LibSqlPinRepository<'_> {
    async fn put(&self, pin: &PinnedEntity) -> Result<()> {
        let data = pin
            .snapshot_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO pinned_jobs (job_id, job_data, pinned_at, updated_at)
                 VALUES (?, ?, ?, ?)",
                params![pin.entity_id.as_str(), data, pin.pinned_at, pin.updated_at],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, entity_id: &str) -> Result<Option<PinnedEntity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT job_id, job_data, pinned_at, updated_at FROM pinned_jobs WHERE job_id = ?",
                [entity_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_pin(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<PinnedEntity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT job_id, job_data, pinned_at, updated_at
                 FROM pinned_jobs
                 ORDER BY updated_at DESC, job_id ASC",
                (),
            )
            .await?;

        let mut pins = Vec::new();
        while let Some(row) = rows.next().await? {
            pins.push(Self::parse_pin(&row)?);
        }
        Ok(pins)
    }

    async fn delete(&self, entity_id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM pinned_jobs WHERE job_id = ?", [entity_id])
            .await?;
        Ok(rows > 0)
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM pinned_jobs", ()).await?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM pinned_jobs", ())
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }
}
