//! SQLite-backed [`DocumentStore`].
//!
//! Each document is a row in `documents`; every write also lands in the
//! `document_log` audit table inside the same transaction.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

use super::DocumentStore;

pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) the database file and wrap it as a document store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = crate::db::open_database(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already-initialized connection (schema and migrations applied).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// In-memory SQLite store.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(crate::db::open_memory_database()?))
    }

    /// Number of audit log entries recorded for `key`.
    pub fn log_count(&self, key: &str) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM document_log WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("db lock poisoned: {e}"))
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| {
            serde_json::from_str(&s).with_context(|| format!("corrupt document under key {key}"))
        })
        .transpose()
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, json, now],
        )?;
        write_audit_log(&tx, "set", key, json.len(), &now)?;
        tx.commit()?;

        tracing::debug!(key, size_bytes = json.len(), "document written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM documents WHERE key = ?1", params![key])?;
        if removed > 0 {
            write_audit_log(&tx, "remove", key, 0, &now)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn write_audit_log(
    conn: &Connection,
    operation: &str,
    key: &str,
    size_bytes: usize,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO document_log (operation, key, size_bytes, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, key, size_bytes as i64, created_at],
    )?;
    Ok(())
}
