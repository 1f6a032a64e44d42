// Copyright 2025 Recall Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! SQLite structured store
//!
//! Holds the whole conversation document as a single row in the
//! `conversation` table, keyed by the canonical row id `"context"`.
//! The schema is versioned: migrations run in order inside transactions
//! and re-opening an already-current database applies nothing. The
//! `messages` table added in v2 is reserved for future per-message
//! normalization; no caller writes to it yet.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use async_trait::async_trait;
use recall_core::ConversationDocument;

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};

/// Canonical row id of the conversation document
const DOCUMENT_ROW_ID: &str = "context";

/// Row id used by the self test, always deleted afterwards
const SELF_TEST_ROW_ID: &str = "__self_test__";

/// A single migration with a version number and SQL to execute
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in version order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "conversation document table",
        sql: "CREATE TABLE IF NOT EXISTS conversation (
                id         TEXT PRIMARY KEY,
                payload    TEXT NOT NULL,
                updated_at TEXT NOT NULL
              );",
    },
    Migration {
        version: 2,
        description: "per-message table reserved for normalization",
        sql: "CREATE TABLE IF NOT EXISTS messages (
                id        TEXT PRIMARY KEY,
                role      TEXT NOT NULL,
                payload   TEXT NOT NULL,
                timestamp TEXT NOT NULL
              );",
    },
];

/// Structured persistence backend over SQLite
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteBackend {
    /// Open or create the database at `path` and bring its schema up to
    /// the current version.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn put_row(&self, id: &str, payload: &str) -> StorageResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO conversation (id, payload, updated_at)
             VALUES (?1, ?2, datetime('now'))",
            params![id, payload],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn get_row(&self, id: &str) -> StorageResult<Option<String>> {
        let conn = self.conn.lock().await;
        let payload = conn
            .query_row(
                "SELECT payload FROM conversation WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    async fn delete_row(&self, id: &str) -> StorageResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM conversation WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    async fn self_test_inner(&self) -> StorageResult<bool> {
        let probe = format!("probe-{}", chrono::Utc::now().timestamp_millis());
        self.put_row(SELF_TEST_ROW_ID, &probe).await?;
        let read_back = self.get_row(SELF_TEST_ROW_ID).await?;
        self.delete_row(SELF_TEST_ROW_ID).await?;
        Ok(read_back.as_deref() == Some(probe.as_str()))
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn save(&self, doc: &ConversationDocument) -> StorageResult<()> {
        let payload = serde_json::to_string(doc)?;
        self.put_row(DOCUMENT_ROW_ID, &payload).await
    }

    async fn load(&self) -> StorageResult<Option<ConversationDocument>> {
        match self.get_row(DOCUMENT_ROW_ID).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        self.delete_row(DOCUMENT_ROW_ID).await
    }

    async fn self_test(&self) -> bool {
        match self.self_test_inner().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "sqlite self test failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Run all pending migrations on the given connection.
///
/// Creates the `schema_version` table if needed, then applies each
/// migration whose version exceeds the current maximum, each in its own
/// transaction. Idempotent: already-applied versions are skipped and
/// existing tables are never dropped.
pub fn run_migrations(conn: &Connection) -> StorageResult<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version <= current {
            debug!(
                version = migration.version,
                "migration already applied, skipping"
            );
            continue;
        }

        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        apply_migration(conn, migration)?;
        applied += 1;
    }

    Ok(applied)
}

/// Highest applied migration version, or 0 if none
pub fn current_version(conn: &Connection) -> StorageResult<u32> {
    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StorageError::Migration {
            message: format!("failed to read schema_version: {e}"),
        })?;
    Ok(version)
}

/// Latest migration version defined in code
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn ensure_version_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version     INTEGER PRIMARY KEY,
           applied_at  TEXT    NOT NULL,
           description TEXT
         );",
    )
    .map_err(|e| StorageError::Migration {
        message: format!("failed to create schema_version table: {e}"),
    })?;
    Ok(())
}

fn apply_migration(conn: &Connection, migration: &Migration) -> StorageResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StorageError::Migration {
            message: format!("failed to begin transaction for v{}: {e}", migration.version),
        })?;

    tx.execute_batch(migration.sql)
        .map_err(|e| StorageError::Migration {
            message: format!(
                "migration v{} ({}) failed: {e}",
                migration.version, migration.description
            ),
        })?;

    tx.execute(
        "INSERT INTO schema_version (version, applied_at, description)
         VALUES (?1, datetime('now'), ?2)",
        params![migration.version, migration.description],
    )
    .map_err(|e| StorageError::Migration {
        message: format!(
            "failed to record v{} in schema_version: {e}",
            migration.version
        ),
    })?;

    tx.commit().map_err(|e| StorageError::Migration {
        message: format!("failed to commit v{}: {e}", migration.version),
    })?;

    Ok(())
}
