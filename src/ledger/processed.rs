//! ProcessedLedger — the persistent dedup store of processed messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::ErrorCode;
use tracing::debug;

use super::db::Database;
use crate::error::LedgerError;

/// One processed message, as persisted. Created exactly once per completed
/// pipeline pass; never updated.
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    pub message_id: String,
    pub subject: String,
    pub from_address: String,
    /// Comma-joined matched filter addresses, empty when none matched.
    pub matched_recipients: String,
    pub received_date: DateTime<Utc>,
    pub artifact_ref: Option<String>,
}

/// Dedup ledger backed by SQLite.
pub struct ProcessedLedger {
    db: Arc<Database>,
}

impl ProcessedLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Whether a record exists for the given normalized message id.
    pub fn exists(&self, message_id: &str) -> Result<bool, LedgerError> {
        let conn = self.db.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM processed_emails WHERE message_id = ?1",
                rusqlite::params![message_id],
                |row| row.get(0),
            )
            .map_err(storage)?;
        Ok(count > 0)
    }

    /// Insert a record. A duplicate `message_id` fails with
    /// [`LedgerError::Conflict`]; every other failure is `Storage`. The
    /// uniqueness check happens at the storage layer, not check-then-insert.
    pub fn insert(&self, record: &ProcessedRecord) -> Result<(), LedgerError> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO processed_emails
                (message_id, subject, from_address, matched_recipients,
                 received_date, artifact_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                record.message_id,
                record.subject,
                record.from_address,
                record.matched_recipients,
                record.received_date.to_rfc3339(),
                record.artifact_ref,
            ],
        )
        .map_err(|e| match &e {
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == ErrorCode::ConstraintViolation =>
            {
                LedgerError::Conflict {
                    message_id: record.message_id.clone(),
                }
            }
            _ => storage(e),
        })?;
        debug!(message_id = %record.message_id, "Processed record inserted");
        Ok(())
    }

    /// All stored message ids, used by the standalone prune pathway.
    pub fn all_ids(&self) -> Result<Vec<String>, LedgerError> {
        let conn = self.db.conn();
        let mut stmt = conn
            .prepare("SELECT message_id FROM processed_emails ORDER BY id")
            .map_err(storage)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;
        Ok(ids)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<u64, LedgerError> {
        let conn = self.db.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM processed_emails", [], |row| {
                row.get(0)
            })
            .map_err(storage)?;
        Ok(count as u64)
    }

    /// Remove every record. Administrative reset path only.
    pub fn clear(&self) -> Result<(), LedgerError> {
        let conn = self.db.conn();
        conn.execute("DELETE FROM processed_emails", [])
            .map_err(storage)?;
        Ok(())
    }
}

fn storage(e: rusqlite::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

// ── Tests ───────────────────────────────────────────────────────────
