//! Artifact writer — persists rendered summaries as markdown files.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::error::ArtifactError;
use crate::mail::message::MailboxMessage;

/// Cap on extracted source links per artifact.
const MAX_LINKS: usize = 50;

/// Persists one rendered summary and returns an artifact reference.
///
/// Implementations must return a unique, collision-free reference per call,
/// even for identical inputs.
pub trait ArtifactWriter: Send + Sync {
    fn save(
        &self,
        message: &MailboxMessage,
        received: DateTime<Utc>,
        summary: &str,
        title: &str,
        matched_recipients: &[String],
    ) -> Result<String, ArtifactError>;
}

/// Markdown files in a flat summaries directory.
///
/// Filenames are `YYYY-MM-DD_<sanitized title>.md`, with an incrementing
/// `_N` suffix when the name is taken.
pub struct MarkdownWriter {
    dir: PathBuf,
}

impl MarkdownWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactWriter for MarkdownWriter {
    fn save(
        &self,
        message: &MailboxMessage,
        received: DateTime<Utc>,
        summary: &str,
        title: &str,
        matched_recipients: &[String],
    ) -> Result<String, ArtifactError> {
        std::fs::create_dir_all(&self.dir)?;

        let date_str = received.format("%Y-%m-%d").to_string();
        let safe_title = sanitize_filename(title);

        let mut filename = format!("{date_str}_{safe_title}.md");
        let mut counter = 1;
        while self.dir.join(&filename).exists() {
            filename = format!("{date_str}_{safe_title}_{counter}.md");
            counter += 1;
        }

        let path = self.dir.join(&filename);
        let content = render_markdown(message, received, summary, title, matched_recipients);
        std::fs::write(&path, content)?;

        debug!(path = %path.display(), "Summary artifact saved");
        Ok(filename)
    }
}

/// Reduce a title to a safe lowercase filename stem.
fn sanitize_filename(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();

    let mut stem = String::new();
    let mut last_was_sep = true;
    for c in kept.to_lowercase().chars() {
        if c.is_whitespace() || c == '_' {
            if !last_was_sep {
                stem.push('_');
                last_was_sep = true;
            }
        } else {
            stem.push(c);
            last_was_sep = false;
        }
    }
    let stem = stem.trim_matches('_').to_string();

    if stem.is_empty() {
        "summary".to_string()
    } else {
        stem
    }
}

fn render_markdown(
    message: &MailboxMessage,
    received: DateTime<Utc>,
    summary: &str,
    title: &str,
    matched_recipients: &[String],
) -> String {
    let links = extract_links(message);
    let sources = if links.is_empty() {
        "No links found.".to_string()
    } else {
        links
            .iter()
            .map(|l| format!("- {l}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let recipients_line = if matched_recipients.is_empty() {
        String::new()
    } else {
        format!(
            "**Matched recipients:** {}  \n",
            matched_recipients.join(", ")
        )
    };

    format!(
        "# {title}\n\n\
         **Date:** {date}  \n\
         **From:** {from}  \n\
         **Subject:** {subject}  \n\
         **Message-ID:** {message_id}  \n\
         **To:** {to}  \n\
         **Cc:** {cc}  \n\
         **Bcc:** {bcc}  \n\
         {recipients_line}\n\
         ---\n\n\
         {summary}\n\n\
         Sources:\n{sources}\n",
        date = received.format("%Y-%m-%d %H:%M"),
        from = message.from_joined(),
        subject = message.subject,
        message_id = message.message_id.as_deref().unwrap_or(""),
        to = message.to.join(", "),
        cc = message.cc.join(", "),
        bcc = message.bcc.join(", "),
    )
}

/// Unique `http(s)` URLs from the message bodies, in order of appearance.
fn extract_links(message: &MailboxMessage) -> Vec<String> {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let re = URL_RE.get_or_init(|| Regex::new(r"https?://[^\s)\]}>\x22]+").expect("valid regex"));

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for body in [&message.content.html, &message.content.text]
        .into_iter()
        .flatten()
    {
        for m in re.find_iter(body) {
            if links.len() >= MAX_LINKS {
                return links;
            }
            if seen.insert(m.as_str().to_string()) {
                links.push(m.as_str().to_string());
            }
        }
    }
    links
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::message::MessageContent;
    use chrono::TimeZone;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    fn message() -> MailboxMessage {
        MailboxMessage {
            subject: "Weekly update".into(),
            from: vec!["news@example.com".into()],
            to: vec!["reader@example.com".into()],
            message_id: Some("id@x".into()),
            content: MessageContent {
                html: None,
                text: Some("See https://example.com/a and https://example.com/a again".into()),
            },
            ..MailboxMessage::default()
        }
    }

    // ── sanitize_filename ───────────────────────────────────────────

    #[test]
    fn sanitize_lowercases_and_joins_words() {
        assert_eq!(sanitize_filename("Weekly Update!"), "weekly_update");
    }

    #[test]
    fn sanitize_collapses_separators() {
        assert_eq!(sanitize_filename("a   b__c"), "a_b_c");
    }

    #[test]
    fn sanitize_empty_falls_back() {
        assert_eq!(sanitize_filename("???"), "summary");
    }

    // ── MarkdownWriter ──────────────────────────────────────────────

    #[test]
    fn save_writes_markdown_with_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = MarkdownWriter::new(tmp.path());

        let reference = writer
            .save(
                &message(),
                received(),
                "A summary.",
                "Weekly Update",
                &["reader@example.com".to_string()],
            )
            .unwrap();

        assert_eq!(reference, "2025-03-14_weekly_update.md");
        let content = std::fs::read_to_string(tmp.path().join(&reference)).unwrap();
        assert!(content.starts_with("# Weekly Update"));
        assert!(content.contains("**From:** news@example.com"));
        assert!(content.contains("**Matched recipients:** reader@example.com"));
        assert!(content.contains("A summary."));
        assert!(content.contains("- https://example.com/a"));
    }

    #[test]
    fn save_is_collision_free_for_identical_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = MarkdownWriter::new(tmp.path());

        let first = writer
            .save(&message(), received(), "s", "Same Title", &[])
            .unwrap();
        let second = writer
            .save(&message(), received(), "s", "Same Title", &[])
            .unwrap();
        let third = writer
            .save(&message(), received(), "s", "Same Title", &[])
            .unwrap();

        assert_eq!(first, "2025-03-14_same_title.md");
        assert_eq!(second, "2025-03-14_same_title_1.md");
        assert_eq!(third, "2025-03-14_same_title_2.md");
    }

    #[test]
    fn links_are_deduplicated() {
        let links = extract_links(&message());
        assert_eq!(links, vec!["https://example.com/a"]);
    }

    #[test]
    fn no_links_renders_placeholder() {
        let mut msg = message();
        msg.content.text = Some("no urls".into());
        let md = render_markdown(&msg, received(), "s", "t", &[]);
        assert!(md.contains("No links found."));
    }
}
