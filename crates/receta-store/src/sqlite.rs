// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SQLite backend for the `recetas` collection.
//
// Schema:
//   recetas(
//     id         TEXT PRIMARY KEY,   -- UUID v4 unless the caller supplied one
//     created_at TEXT NOT NULL,      -- RFC 3339
//     data       TEXT NOT NULL       -- full row as JSON
//   )

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use receta_core::Row;
use receta_core::error::{RecetaError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::store::RecetaStore;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS recetas (
        id         TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        data       TEXT NOT NULL
    )
"#;

/// Convert a `rusqlite::Error` into a `RecetaError::Database`.
fn db_err(e: rusqlite::Error) -> RecetaError {
    RecetaError::Database(e.to_string())
}

/// Prescriptions stored as JSON documents in a local SQLite file.
///
/// The connection is `Send` but not `Sync`, so it sits behind a mutex and
/// every query runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        Self::init(conn)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;
        info!("recetas table ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RecetaError::Database("connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| RecetaError::Database(format!("database task failed: {e}")))?
    }

    /// Fetch a stored row by id.
    pub async fn get(&self, id: &str) -> Result<Option<Row>> {
        let id = id.to_owned();
        self.with_conn(move |conn| {
            let data: Option<String> = conn
                .query_row("SELECT data FROM recetas WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(db_err)?;
            data.map(|json| parse_row(&json)).transpose()
        })
        .await
    }

    /// Number of stored prescriptions.
    pub async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM recetas", [], |row| row.get(0))
                .map_err(db_err)
        })
        .await
    }
}

fn parse_row(json: &str) -> Result<Row> {
    match serde_json::from_str(json)? {
        Value::Object(row) => Ok(row),
        _ => Err(RecetaError::Database("stored receta is not an object".into())),
    }
}

/// Id to store under: a caller-supplied non-empty string, or a fresh UUID.
fn assign_id(row: &Row) -> String {
    match row.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        _ => Uuid::new_v4().to_string(),
    }
}

#[async_trait]
impl RecetaStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_receta(&self, mut row: Row) -> Result<Row> {
        let id = assign_id(&row);
        let created_at = Utc::now().to_rfc3339();
        row.insert("id".into(), Value::String(id.clone()));
        row.insert("created_at".into(), Value::String(created_at.clone()));

        let json = serde_json::to_string(&row)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO recetas (id, created_at, data) VALUES (?1, ?2, ?3)",
                params![id, created_at, json],
            )
            .map_err(db_err)?;
            debug!(%id, "receta inserted");
            Ok(())
        })
        .await?;

        Ok(row)
    }
}
