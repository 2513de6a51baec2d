//! Summarization collaborator — LLM-backed summary and title generation.
//!
//! One typed adapter per backend, selected at configuration time via
//! [`create_summarizer`]. Uses rig-core for transport; no runtime probing
//! of response shapes.
//!
//! Failure policy: errors from either call propagate to the orchestrator,
//! which leaves the candidate unmarked so it is retried on the next run.
//! No placeholder text is ever produced here.

mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use secrecy::ExposeSecret;

use crate::config::{LlmBackend, LlmConfig};
use crate::error::SummarizeError;

pub use prompts::{summary_prompt, title_prompt};

/// Maximum title length requested from the model.
pub const MAX_TITLE_CHARS: usize = 60;

/// LLM summarization contract consumed by the pipeline.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a single-paragraph plain-text summary of the message content.
    async fn summarize(&self, content: &str) -> Result<String, SummarizeError>;

    /// Produce a short title from the subject and the summary.
    async fn title(&self, subject: &str, summary: &str) -> Result<String, SummarizeError>;
}

/// Create a summarizer adapter from configuration.
pub fn create_summarizer(config: &LlmConfig) -> Result<Arc<dyn Summarizer>, SummarizeError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic(config),
        LlmBackend::OpenAi => create_openai(config),
    }
}

fn create_anthropic(config: &LlmConfig) -> Result<Arc<dyn Summarizer>, SummarizeError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            SummarizeError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {e}"),
            }
        })?;

    tracing::info!("Using Anthropic summarizer (model: {})", config.model);
    Ok(Arc::new(AnthropicSummarizer {
        client,
        model: config.model.clone(),
    }))
}

fn create_openai(config: &LlmConfig) -> Result<Arc<dyn Summarizer>, SummarizeError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            SummarizeError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {e}"),
            }
        })?;

    tracing::info!("Using OpenAI summarizer (model: {})", config.model);
    Ok(Arc::new(OpenAiSummarizer {
        client,
        model: config.model.clone(),
    }))
}

/// Anthropic-backed summarizer.
struct AnthropicSummarizer {
    client: rig::client::Client<rig::providers::anthropic::client::AnthropicExt>,
    model: String,
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize(&self, content: &str) -> Result<String, SummarizeError> {
        let response = self
            .client
            .agent(&self.model)
            .build()
            .prompt(summary_prompt(content))
            .await
            .map_err(|e| request_failed("anthropic", e))?;
        finish_summary("anthropic", response)
    }

    async fn title(&self, subject: &str, summary: &str) -> Result<String, SummarizeError> {
        let response = self
            .client
            .agent(&self.model)
            .build()
            .prompt(title_prompt(subject, summary))
            .await
            .map_err(|e| request_failed("anthropic", e))?;
        finish_title("anthropic", response)
    }
}

/// OpenAI-backed summarizer.
struct OpenAiSummarizer {
    client: rig::client::Client<rig::providers::openai::client::OpenAIResponsesExt>,
    model: String,
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, content: &str) -> Result<String, SummarizeError> {
        let response = self
            .client
            .agent(&self.model)
            .build()
            .prompt(summary_prompt(content))
            .await
            .map_err(|e| request_failed("openai", e))?;
        finish_summary("openai", response)
    }

    async fn title(&self, subject: &str, summary: &str) -> Result<String, SummarizeError> {
        let response = self
            .client
            .agent(&self.model)
            .build()
            .prompt(title_prompt(subject, summary))
            .await
            .map_err(|e| request_failed("openai", e))?;
        finish_title("openai", response)
    }
}

fn request_failed(provider: &str, e: impl std::fmt::Display) -> SummarizeError {
    SummarizeError::RequestFailed {
        provider: provider.to_string(),
        reason: e.to_string(),
    }
}

fn finish_summary(provider: &str, response: String) -> Result<String, SummarizeError> {
    let summary = response.trim().to_string();
    if summary.is_empty() {
        return Err(SummarizeError::EmptyResponse {
            provider: provider.to_string(),
        });
    }
    Ok(summary)
}

/// Clean up a generated title: drop quote characters, trim.
fn finish_title(provider: &str, response: String) -> Result<String, SummarizeError> {
    let title: String = response
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .collect::<String>()
        .trim()
        .to_string();
    if title.is_empty() {
        return Err(SummarizeError::EmptyResponse {
            provider: provider.to_string(),
        });
    }
    Ok(title)
}

// ── Tests ───────────────────────────────────────────────────────────
