//! Configuration, built from environment variables.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// IMAP mailbox configuration.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub folder: String,
    /// Raw recipient filter list, `,`/`;` separated.
    pub recipient_filters: String,
    /// Per-run cap on candidates; older matches beyond it wait for a later run.
    pub max_candidates: usize,
}

impl ImapConfig {
    /// Build from `DIGEST_IMAP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = require_env("DIGEST_IMAP_HOST")?;
        let username = require_env("DIGEST_IMAP_USERNAME")?;
        let password = SecretString::from(require_env("DIGEST_IMAP_PASSWORD")?);
        let recipient_filters = require_env("DIGEST_RECIPIENTS")?;

        let port = parse_env("DIGEST_IMAP_PORT", 993)?;
        let folder = std::env::var("DIGEST_IMAP_FOLDER").unwrap_or_else(|_| "INBOX".to_string());
        let max_candidates = parse_env("DIGEST_MAX_EMAILS", 50)?;

        Ok(Self {
            host,
            port,
            username,
            password,
            folder,
            recipient_filters,
            max_candidates,
        })
    }
}

/// Supported LLM backends. Selected once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for the summarizer adapter.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Build from environment. `DIGEST_LLM_BACKEND` chooses the adapter
    /// (`anthropic` default, or `openai`); the matching API key variable is
    /// required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_raw =
            std::env::var("DIGEST_LLM_BACKEND").unwrap_or_else(|_| "anthropic".to_string());
        let backend = match backend_raw.to_lowercase().as_str() {
            "anthropic" => LlmBackend::Anthropic,
            "openai" => LlmBackend::OpenAi,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "DIGEST_LLM_BACKEND".to_string(),
                    message: format!("unknown backend {other:?}, expected anthropic or openai"),
                })
            }
        };

        let (key_var, default_model) = match backend {
            LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
            LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o-mini"),
        };
        let api_key = SecretString::from(require_env(key_var)?);
        let model =
            std::env::var("DIGEST_LLM_MODEL").unwrap_or_else(|_| default_model.to_string());

        Ok(Self {
            backend,
            api_key,
            model,
        })
    }
}

/// Top-level configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub imap: ImapConfig,
    pub llm: LlmConfig,
    pub ledger_path: PathBuf,
    pub summaries_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            imap: ImapConfig::from_env()?,
            llm: LlmConfig::from_env()?,
            ledger_path: std::env::var("DIGEST_DB_PATH")
                .unwrap_or_else(|_| "./data/digest.db".to_string())
                .into(),
            summaries_dir: std::env::var("DIGEST_SUMMARIES_DIR")
                .unwrap_or_else(|_| "./summaries".to_string())
                .into(),
        })
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: name.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them to pure helpers where
    // possible and a single guarded missing-var check.

    #[test]
    fn parse_env_default_when_unset() {
        let port: u16 = parse_env("DIGEST_TEST_UNSET_PORT", 993).unwrap();
        assert_eq!(port, 993);
    }

    #[test]
    fn imap_config_missing_host_errors() {
        std::env::remove_var("DIGEST_IMAP_HOST");
        let err = ImapConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(v) if v == "DIGEST_IMAP_HOST"));
    }
}
