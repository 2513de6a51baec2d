//! Message identity — canonical Message-ID keys and the deterministic
//! fallback fingerprint for messages without a native id.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Domain tag appended to synthesized fallback ids.
const FALLBACK_SUFFIX: &str = "@local";

/// Canonicalize a native Message-ID: trim and strip angle brackets.
pub fn normalize_message_id(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_string()
}

/// Deterministic fallback id for a message lacking a Message-ID header.
///
/// Identical `(subject, received, from)` triples always yield a
/// byte-identical id, so re-running against an unchanged mailbox never
/// double-processes such a message.
pub fn fallback_message_id(subject: &str, received: DateTime<Utc>, from: &str) -> String {
    let base = format!("{}-{}-{}", subject, received.to_rfc3339(), from);
    let digest = Sha256::digest(base.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("generated-{}{}", &hex[..16], FALLBACK_SUFFIX)
}

/// Resolve the canonical key for a message: native id when present,
/// fallback fingerprint otherwise.
pub fn canonical_message_id(
    message_id: Option<&str>,
    subject: &str,
    received: DateTime<Utc>,
    from: &str,
) -> String {
    match message_id {
        Some(raw) if !normalize_message_id(raw).is_empty() => normalize_message_id(raw),
        _ => fallback_message_id(subject, received, from),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn normalize_strips_brackets_and_whitespace() {
        assert_eq!(normalize_message_id(" <abc@mail.test> "), "abc@mail.test");
        assert_eq!(normalize_message_id("abc@mail.test"), "abc@mail.test");
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = fallback_message_id("Weekly digest", date(), "news@example.com");
        let b = fallback_message_id("Weekly digest", date(), "news@example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_has_expected_shape() {
        let id = fallback_message_id("Subject", date(), "a@b.com");
        assert!(id.starts_with("generated-"));
        assert!(id.ends_with("@local"));
        // generated- + 16 hex chars + @local
        assert_eq!(id.len(), "generated-".len() + 16 + "@local".len());
    }

    #[test]
    fn fallback_differs_for_different_inputs() {
        let a = fallback_message_id("Subject", date(), "a@b.com");
        let b = fallback_message_id("Subject", date(), "c@d.com");
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_prefers_native_id() {
        let id = canonical_message_id(Some("<native@id>"), "s", date(), "f");
        assert_eq!(id, "native@id");
    }

    #[test]
    fn canonical_falls_back_on_blank_native_id() {
        let id = canonical_message_id(Some(" <> "), "s", date(), "f");
        assert!(id.starts_with("generated-"));
        let id = canonical_message_id(None, "s", date(), "f");
        assert!(id.starts_with("generated-"));
    }
}
