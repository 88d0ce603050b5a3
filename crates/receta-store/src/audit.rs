// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatch log — append-only SQLite record of each step of the
// create-and-send flow, so a receta that was stored but never reached the
// patient can be found afterwards.
//
// Schema:
//   dispatch_log(
//     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp     TEXT    NOT NULL,   -- RFC 3339
//     step          TEXT    NOT NULL,   -- "insert" | "render" | "email"
//     receta_id     TEXT,               -- absent when the insert itself failed
//     success       INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     document_hash TEXT,               -- SHA-256 hex of the PDF, once rendered
//     details       TEXT
//   )

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use receta_core::error::{RecetaError, Result};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS dispatch_log (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp     TEXT    NOT NULL,
        step          TEXT    NOT NULL,
        receta_id     TEXT,
        success       INTEGER NOT NULL,
        document_hash TEXT,
        details       TEXT
    );";

fn db_err(e: rusqlite::Error) -> RecetaError {
    RecetaError::Database(e.to_string())
}

/// Stage of the create-and-send flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStep {
    Insert,
    Render,
    Email,
}

impl DispatchStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Render => "render",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for DispatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the dispatch log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEntry {
    pub id: i64,
    pub timestamp: String,
    pub step: String,
    pub receta_id: Option<String>,
    pub success: bool,
    pub document_hash: Option<String>,
    pub details: Option<String>,
}

/// Append-only dispatch log backed by SQLite.
///
/// Shares the connection handling of [`crate::SqliteStore`]: one connection
/// behind a mutex, every statement on the blocking pool.
#[derive(Clone)]
pub struct DispatchLog {
    conn: Arc<Mutex<Connection>>,
}

impl DispatchLog {
    /// Open (or create) the log database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        debug!("dispatch log opened");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RecetaError::Database("dispatch log lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| RecetaError::Database(format!("dispatch log task failed: {e}")))?
    }

    /// Append an entry for `step`.
    #[instrument(skip_all, fields(step = %step, receta_id = ?receta_id, success = success))]
    pub async fn record(
        &self,
        step: DispatchStep,
        receta_id: Option<&str>,
        success: bool,
        document_hash: Option<&str>,
        details: Option<&str>,
    ) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();
        let receta_id = receta_id.map(str::to_owned);
        let document_hash = document_hash.map(str::to_owned);
        let details = details.map(str::to_owned);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO dispatch_log
                     (timestamp, step, receta_id, success, document_hash, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    timestamp,
                    step.as_str(),
                    receta_id,
                    i32::from(success),
                    document_hash,
                    details
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await?;

        debug!("dispatch entry recorded");
        Ok(())
    }

    /// All entries for `receta_id`, oldest first.
    pub async fn entries_for_receta(&self, receta_id: &str) -> Result<Vec<DispatchEntry>> {
        let receta_id = receta_id.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, step, receta_id, success, document_hash, details
                     FROM dispatch_log
                     WHERE receta_id = ?1
                     ORDER BY id ASC",
                )
                .map_err(db_err)?;

            let rows = stmt
                .query_map(params![receta_id], |row| {
                    Ok(DispatchEntry {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        step: row.get(2)?,
                        receta_id: row.get(3)?,
                        success: row.get::<_, i32>(4)? != 0,
                        document_hash: row.get(5)?,
                        details: row.get(6)?,
                    })
                })
                .map_err(db_err)?;

            let entries = rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;
            Ok(entries)
        })
        .await
    }

    /// Recetas whose most recent email attempt failed.
    pub async fn undelivered(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT receta_id FROM dispatch_log AS d
                     WHERE step = 'email' AND receta_id IS NOT NULL
                       AND id = (SELECT MAX(id) FROM dispatch_log
                                 WHERE step = 'email' AND receta_id = d.receta_id)
                       AND success = 0
                     ORDER BY id ASC",
                )
                .map_err(db_err)?;
            let ids = stmt
                .query_map([], |row| row.get(0))
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<String>, _>>()
                .map_err(db_err)?;
            Ok(ids)
        })
        .await
    }

    pub async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM dispatch_log", [], |row| row.get(0))
                .map_err(db_err)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> DispatchLog {
        DispatchLog::open_in_memory().expect("open in-memory dispatch log")
    }

    #[tokio::test]
    async fn record_and_count() {
        let log = make_log();
        assert_eq!(log.count().await.unwrap(), 0);

        log.record(DispatchStep::Insert, Some("r-1"), true, None, None)
            .await
            .unwrap();
        log.record(DispatchStep::Render, Some("r-1"), true, Some("abc"), None)
            .await
            .unwrap();

        assert_eq!(log.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn entries_are_scoped_to_receta() {
        let log = make_log();
        log.record(DispatchStep::Insert, Some("a"), true, None, None)
            .await
            .unwrap();
        log.record(DispatchStep::Insert, Some("b"), true, None, None)
            .await
            .unwrap();
        log.record(DispatchStep::Email, Some("a"), false, Some("ff"), Some("smtp down"))
            .await
            .unwrap();

        let entries = log.entries_for_receta("a").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].step, "insert");
        assert!(entries[0].success);
        assert_eq!(entries[1].step, "email");
        assert!(!entries[1].success);
        assert_eq!(entries[1].document_hash.as_deref(), Some("ff"));
        assert_eq!(entries[1].details.as_deref(), Some("smtp down"));
    }

    #[tokio::test]
    async fn failed_insert_has_no_receta_id() {
        let log = make_log();
        log.record(DispatchStep::Insert, None, false, None, Some("unique violation"))
            .await
            .unwrap();
        assert_eq!(log.count().await.unwrap(), 1);
        assert!(log.undelivered().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn undelivered_tracks_latest_email_attempt() {
        let log = make_log();
        log.record(DispatchStep::Email, Some("a"), false, None, None)
            .await
            .unwrap();
        log.record(DispatchStep::Email, Some("b"), false, None, None)
            .await
            .unwrap();
        log.record(DispatchStep::Email, Some("a"), true, None, None)
            .await
            .unwrap();

        assert_eq!(log.undelivered().await.unwrap(), vec!["b".to_owned()]);
    }

    #[tokio::test]
    async fn persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.db");
        {
            let log = DispatchLog::open(&path).unwrap();
            log.record(DispatchStep::Insert, Some("x"), true, None, None)
                .await
                .unwrap();
        }
        let reopened = DispatchLog::open(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_records_all_land() {
        let log = make_log();
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    let id = format!("r-{i}");
                    log.record(DispatchStep::Email, Some(&id), true, None, None)
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(log.count().await.unwrap(), 32);
        assert!(log.undelivered().await.unwrap().is_empty());
    }

    #[test]
    fn step_names() {
        assert_eq!(DispatchStep::Email.to_string(), "email");
        assert_eq!(serde_json::to_string(&DispatchStep::Render).unwrap(), "\"render\"");
    }
}
