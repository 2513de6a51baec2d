//! Error types for inbox-digest.

/// Top-level error type for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail session error: {0}")]
    Mail(#[from] MailError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Summarization error: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail protocol errors.
///
/// `Connection`, `Auth` and `Select` are fatal for a run. The per-operation
/// variants (`Search`, `Fetch`, `Flag`, `Expunge`, `Logout`) are absorbed
/// and logged by the session client or the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Connection to {host}:{port} failed: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("IMAP login failed for {username}: {reason}")]
    Auth { username: String, reason: String },

    #[error("Failed to select folder {folder}: {reason}")]
    Select { folder: String, reason: String },

    #[error("SEARCH failed: {0}")]
    Search(String),

    #[error("FETCH failed for message {seq}: {reason}")]
    Fetch { seq: u32, reason: String },

    #[error("STORE failed for message {seq}: {reason}")]
    Flag { seq: u32, reason: String },

    #[error("EXPUNGE failed: {0}")]
    Expunge(String),

    #[error("LOGOUT failed: {0}")]
    Logout(String),
}

/// Dedup ledger errors.
///
/// `Conflict` is the expected "already processed" signal and must stay
/// distinguishable from real storage failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Record already exists for message {message_id}")]
    Conflict { message_id: String },

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LedgerError {
    /// True for the benign duplicate-insert case.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

/// Summarizer collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned an empty completion")]
    EmptyResponse { provider: String },
}

/// Artifact writer errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Report generation errors. Absorbed by the orchestrator — a failed
/// report never fails the run.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
