//! Mailbox ingestion and summarization pipeline.
//!
//! Searches an IMAP folder for messages addressed to configured recipient
//! filters, summarizes each new message with an LLM, writes a markdown
//! artifact per message, and records every processed Message-ID in a
//! SQLite ledger so reruns are idempotent.

pub mod artifact;
pub mod config;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod mail;
pub mod msgid;
pub mod pipeline;
pub mod report;
pub mod summarizer;

pub use error::{Error, Result};
