//! SQLite-backed snapshot store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::SnapshotStore;
use crate::domain::{FileRecord, Snapshot, SnapshotKey};
use crate::error::CacheError;

pub const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS git (
                provider TEXT NOT NULL,
                repo TEXT NOT NULL,
                branch TEXT NOT NULL,
                \"commit\" TEXT NOT NULL,
                files TEXT NOT NULL,
                ingested_at TEXT NOT NULL,
                PRIMARY KEY (provider, repo, branch, \"commit\")
            );
            ",
        )?;

        let current: Option<i64> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?;
        match current {
            None => {
                conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])?;
            }
            Some(version) if version == SCHEMA_VERSION => {}
            Some(found) => {
                return Err(CacheError::SchemaVersion { found, expected: SCHEMA_VERSION });
            }
        }

        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl SnapshotStore for SqliteStore {
    fn find_first(&self, key: &SnapshotKey) -> Result<Option<Snapshot>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT files, ingested_at FROM git
                 WHERE provider = ?1 AND repo = ?2 AND branch = ?3 AND \"commit\" = ?4
                 LIMIT 1",
                params![key.provider, key.repo_path, key.branch, key.commit],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((files_json, ingested_at)) = row else {
            return Ok(None);
        };

        let files: Vec<FileRecord> = serde_json::from_str(&files_json)?;
        let ingested_at = DateTime::parse_from_rfc3339(&ingested_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CacheError::Corrupt(format!("bad ingested_at '{ingested_at}': {e}")))?;

        Ok(Some(Snapshot { key: key.clone(), files, ingested_at }))
    }

    fn insert(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let files_json = serde_json::to_string(&snapshot.files)?;
        let mut conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO git(provider, repo, branch, \"commit\", files, ingested_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                snapshot.key.provider,
                snapshot.key.repo_path,
                snapshot.key.branch,
                snapshot.key.commit,
                files_json,
                snapshot.ingested_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}
