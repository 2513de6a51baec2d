//! Parsed mailbox messages — owned representation of one fetched email.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;

/// Body content of a fetched message.
///
/// Either part may be absent; `summary_input()` picks the best available
/// text for downstream summarization.
#[derive(Debug, Clone, Default)]
pub struct MessageContent {
    pub html: Option<String>,
    pub text: Option<String>,
}

/// A fetched message, owned and detached from the IMAP session.
///
/// `seq` is the protocol-assigned sequence number — session-scoped, never
/// persisted. `message_id` is the server/sender-assigned header value and
/// may be absent.
#[derive(Debug, Clone, Default)]
pub struct MailboxMessage {
    pub seq: u32,
    pub message_id: Option<String>,
    pub subject: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub date: Option<DateTime<Utc>>,
    pub content: MessageContent,
}

impl MailboxMessage {
    /// Parse a raw RFC822 message fetched under the given sequence number.
    ///
    /// Returns `None` when the bytes are not parseable as a message.
    pub fn parse(seq: u32, raw: &[u8]) -> Option<Self> {
        let parsed = MessageParser::default().parse(raw)?;

        let date = parsed
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

        Some(Self {
            seq,
            message_id: parsed.message_id().map(|s| s.to_string()),
            subject: parsed.subject().unwrap_or_default().to_string(),
            from: extract_addresses(parsed.from()),
            to: extract_addresses(parsed.to()),
            cc: extract_addresses(parsed.cc()),
            bcc: extract_addresses(parsed.bcc()),
            date,
            content: MessageContent {
                html: parsed.body_html(0).map(|c| c.to_string()),
                text: parsed.body_text(0).map(|c| c.to_string()),
            },
        })
    }

    /// Comma-joined sender list for the ledger and artifacts.
    pub fn from_joined(&self) -> String {
        self.from.join(", ")
    }

    /// Best available text for the summarizer: stripped HTML part first,
    /// then the plain-text part, then nothing.
    pub fn summary_input(&self) -> String {
        if let Some(html) = &self.content.html {
            return strip_html(html);
        }
        if let Some(text) = &self.content.text {
            return text.trim().to_string();
        }
        String::new()
    }
}

/// Extract email addresses from an optional mail_parser Address field.
///
/// Returns an empty vec if the address is None.
pub fn extract_addresses(addr: Option<&mail_parser::Address>) -> Vec<String> {
    let Some(addr) = addr else {
        return Vec::new();
    };
    match addr {
        mail_parser::Address::List(addrs) => addrs
            .iter()
            .filter_map(|a| a.address.as_ref().map(|s| s.to_string()))
            .collect(),
        mail_parser::Address::Group(groups) => groups
            .iter()
            .flat_map(|g| {
                g.addresses
                    .iter()
                    .filter_map(|a| a.address.as_ref().map(|s| s.to_string()))
            })
            .collect(),
    }
}

/// Strip HTML tags from content (basic) and normalize whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ───────────────────────────────────────────────────────────
