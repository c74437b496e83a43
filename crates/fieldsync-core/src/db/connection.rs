//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::{Path, PathBuf};

use super::migrations;

/// Where the local store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A database file on disk, created if missing
    File(PathBuf),
    /// A private in-memory database (useful for testing)
    Memory,
}

impl StoreLocation {
    /// Open and migrate the database at this location
    pub async fn open(&self) -> Result<Database> {
        match self {
            Self::File(path) => Database::open(path).await,
            Self::Memory => Database::open_in_memory().await,
        }
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    // Keeps the database alive for as long as the connection is used.
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically. Failing to create or open the file means
    /// the host cannot offer persistent storage at all.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| {
                Error::StorageUnavailable(format!(
                    "cannot create store directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let path_str = path.to_string_lossy().to_string();
        let db = Builder::new_local(&path_str)
            .build()
            .await
            .map_err(|error| {
                Error::StorageUnavailable(format!("cannot open store at {path_str}: {error}"))
            })?;
        let conn = db
            .connect()
            .map_err(|error| Error::StorageUnavailable(error.to_string()))?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        tracing::debug!("Opened local store at {path_str}");
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|error| Error::StorageUnavailable(error.to_string()))?;
        let conn = db
            .connect()
            .map_err(|error| Error::StorageUnavailable(error.to_string()))?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for a crash-durable single-writer store
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = FULL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA busy_timeout = 5000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("offline.db");

        StoreLocation::File(path.clone()).open().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_reports_unavailable_storage() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Database::open(blocker.join("offline.db")).await;
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }
}
