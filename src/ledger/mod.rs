//! Persistence layer — the SQLite-backed dedup ledger.

pub mod db;
pub mod processed;

pub use db::Database;
pub use processed::{ProcessedLedger, ProcessedRecord};
