//! Recipient filter matching — normalized address sets and exact matching.
//!
//! Matching is exact, case-insensitive equality after normalization. This is
//! a precise allow-list: a filter of `domain.com` does NOT match
//! `user@sub.domain.com`, and filters are never matched against `From`.

use std::collections::BTreeSet;

use crate::mail::message::MailboxMessage;

/// A deduplicated set of normalized recipient addresses.
///
/// `BTreeSet` keeps iteration order deterministic for logging and for the
/// comma-joined `matched_recipients` ledger column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientFilterSet {
    addresses: BTreeSet<String>,
}

impl RecipientFilterSet {
    /// Parse a filter list from a single string, split on `,` or `;`.
    pub fn parse(raw: &str) -> Self {
        Self::from_list(raw.split([',', ';']))
    }

    /// Build a filter set from individual address tokens.
    ///
    /// Each token is normalized; empty results are dropped.
    pub fn from_list<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = tokens
            .into_iter()
            .map(|t| normalize_address(t.as_ref()))
            .filter(|a| !a.is_empty())
            .collect();
        Self { addresses }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Exact membership after normalizing the candidate.
    pub fn contains(&self, candidate: &str) -> bool {
        self.addresses.contains(&normalize_address(candidate))
    }

    /// Iterate the normalized filter addresses in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(|s| s.as_str())
    }
}

/// Normalize a raw address token: strip quotes and angle brackets, trim,
/// lowercase.
pub fn normalize_address(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '<' | '>'))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// True if any of `candidates` equals `filter` after normalization.
pub fn matches(candidates: &[String], filter: &str) -> bool {
    let target = normalize_address(filter);
    if target.is_empty() {
        return false;
    }
    candidates.iter().any(|c| normalize_address(c) == target)
}

/// The subset of `filters` present among the message's recipients.
///
/// Pools To ∪ Cc ∪ Bcc only — the sender is deliberately excluded.
pub fn matched_filters(message: &MailboxMessage, filters: &RecipientFilterSet) -> Vec<String> {
    if filters.is_empty() {
        return Vec::new();
    }

    let pool: BTreeSet<String> = message
        .to
        .iter()
        .chain(message.cc.iter())
        .chain(message.bcc.iter())
        .map(|a| normalize_address(a))
        .collect();

    filters
        .iter()
        .filter(|f| pool.contains(*f))
        .map(|f| f.to_string())
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::message::MailboxMessage;

    fn message_with(to: &[&str], cc: &[&str], bcc: &[&str], from: &[&str]) -> MailboxMessage {
        MailboxMessage {
            to: to.iter().map(|s| s.to_string()).collect(),
            cc: cc.iter().map(|s| s.to_string()).collect(),
            bcc: bcc.iter().map(|s| s.to_string()).collect(),
            from: from.iter().map(|s| s.to_string()).collect(),
            ..MailboxMessage::default()
        }
    }

    // ── Normalization ───────────────────────────────────────────────

    #[test]
    fn normalize_strips_quotes_and_brackets() {
        assert_eq!(normalize_address("\"<User@Example.COM>\""), "user@example.com");
        assert_eq!(normalize_address("  'a@b.com'  "), "a@b.com");
    }

    #[test]
    fn parse_splits_on_comma_and_semicolon() {
        let set = RecipientFilterSet::parse("a@x.com, b@x.com; C@X.com");
        assert_eq!(set.len(), 3);
        assert!(set.contains("c@x.com"));
    }

    #[test]
    fn parse_drops_empty_and_dedups() {
        let set = RecipientFilterSet::parse("a@x.com,, A@X.COM ;");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn from_list_accepts_explicit_tokens() {
        let set = RecipientFilterSet::from_list(["<a@x.com>", "b@x.com"]);
        assert!(set.contains("a@x.com"));
        assert!(set.contains("B@x.com"));
    }

    // ── Exact matching ──────────────────────────────────────────────

    #[test]
    fn exact_match_is_case_insensitive() {
        let candidates = vec!["Recipient@Example.com".to_string()];
        assert!(matches(&candidates, "recipient@example.com"));
    }

    #[test]
    fn domain_filter_does_not_match_subdomain_address() {
        let candidates = vec!["user@sub.domain.com".to_string()];
        assert!(!matches(&candidates, "domain.com"));
    }

    #[test]
    fn no_substring_matching() {
        let candidates = vec!["alice@example.com".to_string()];
        assert!(!matches(&candidates, "example.com"));
        assert!(!matches(&candidates, "alice"));
    }

    #[test]
    fn empty_filter_never_matches() {
        let candidates = vec!["a@x.com".to_string()];
        assert!(!matches(&candidates, "  "));
    }

    // ── matched_filters ─────────────────────────────────────────────

    #[test]
    fn matched_filters_pools_to_cc_bcc() {
        let msg = message_with(
            &["To@x.com"],
            &["cc@x.com"],
            &["<bcc@x.com>"],
            &["from@x.com"],
        );
        let filters = RecipientFilterSet::parse("to@x.com, cc@x.com, bcc@x.com, other@x.com");
        let matched = matched_filters(&msg, &filters);
        assert_eq!(matched, vec!["bcc@x.com", "cc@x.com", "to@x.com"]);
    }

    #[test]
    fn matched_filters_never_consults_from() {
        let msg = message_with(&[], &[], &[], &["target@x.com"]);
        let filters = RecipientFilterSet::parse("target@x.com");
        assert!(matched_filters(&msg, &filters).is_empty());
    }

    #[test]
    fn matched_filters_empty_inputs_yield_empty() {
        let msg = message_with(&[], &[], &[], &[]);
        assert!(matched_filters(&msg, &RecipientFilterSet::default()).is_empty());
        let filters = RecipientFilterSet::parse("a@x.com");
        assert!(matched_filters(&msg, &filters).is_empty());
    }
}
