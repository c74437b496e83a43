//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: pinned entities and the sync queue
async fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Records the user keeps available offline
        "CREATE TABLE IF NOT EXISTS pinned_jobs (
            job_id TEXT PRIMARY KEY,
            job_data TEXT,
            pinned_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        // Pending writes
        "CREATE TABLE IF NOT EXISTS sync_queue (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            payload TEXT NOT NULL,
            meta TEXT,
            created_at INTEGER NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_created ON sync_queue(created_at ASC)",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated local store to version {CURRENT_VERSION}");
    Ok(())
}
