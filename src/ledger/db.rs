//! SQLite database handle — connection wrapper and schema migrations.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use crate::error::LedgerError;

/// Shared database handle wrapping a SQLite connection behind a Mutex.
///
/// Using `Mutex` (not `RwLock`) because rusqlite `Connection` is `!Sync`.
/// Access is serialized — the pipeline is single-threaded anyway, and the
/// UNIQUE constraint on `message_id` enforces dedup at the storage layer.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Storage(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {e}", path.display())))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        info!(path = %path.display(), "Ledger database opened");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get a lock on the underlying connection.
    ///
    /// Callers hold the lock for the duration of their DB operation.
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Database mutex poisoned")
    }

    /// Run schema migrations: base table creation plus additive column
    /// migrations for databases created by older versions. Never
    /// destructive.
    fn run_migrations(&self) -> Result<(), LedgerError> {
        let conn = self.conn();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS processed_emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id TEXT UNIQUE NOT NULL,
                subject TEXT NOT NULL,
                from_address TEXT NOT NULL,
                matched_recipients TEXT,
                received_date TEXT NOT NULL,
                artifact_ref TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_processed_emails_received
                ON processed_emails(received_date);",
        )
        .map_err(|e| LedgerError::Migration(e.to_string()))?;

        // Older on-disk layouts predate these optional columns.
        add_column_unless_exists(&conn, "processed_emails", "matched_recipients", "TEXT")?;
        add_column_unless_exists(&conn, "processed_emails", "artifact_ref", "TEXT")?;

        Ok(())
    }
}

/// Add a column to an existing table if it is missing.
fn add_column_unless_exists(
    conn: &Connection,
    table: &str,
    column: &str,
    sql_type: &str,
) -> Result<(), LedgerError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| LedgerError::Migration(e.to_string()))?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| LedgerError::Migration(e.to_string()))?
        .collect::<Result<_, _>>()
        .map_err(|e| LedgerError::Migration(e.to_string()))?;

    if names.iter().any(|n| n == column) {
        return Ok(());
    }

    conn.execute(
        &format!("ALTER TABLE {table} ADD COLUMN {column} {sql_type}"),
        [],
    )
    .map_err(|e| LedgerError::Migration(e.to_string()))?;
    info!(table = table, column = column, "Added missing ledger column");
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
