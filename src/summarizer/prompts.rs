//! Prompt construction for summary and title generation.

use super::MAX_TITLE_CHARS;

/// How much of the summary the title prompt sees.
const TITLE_SUMMARY_PREFIX_CHARS: usize = 200;

/// Prompt for the one-paragraph message summary.
pub fn summary_prompt(content: &str) -> String {
    format!(
        "Write a concise summary of the following email.\n\
         Respond with ONE compact plain-text paragraph — no headings, \
         lists, or markdown.\n\n\
         Email content:\n{content}\n\n\
         Summary (one paragraph, plain text):"
    )
}

/// Prompt for a short title derived from subject and summary.
pub fn title_prompt(subject: &str, summary: &str) -> String {
    let prefix: String = summary.chars().take(TITLE_SUMMARY_PREFIX_CHARS).collect();
    format!(
        "Create a clear, short title (max {MAX_TITLE_CHARS} characters) for \
         this email summary. The title should reflect the main topics.\n\n\
         Email subject: {subject}\n\
         Summary: {prefix}\n\n\
         Title:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_embeds_content() {
        let p = summary_prompt("body text here");
        assert!(p.contains("body text here"));
        assert!(p.contains("one paragraph"));
    }

    #[test]
    fn title_prompt_truncates_long_summaries() {
        let long = "x".repeat(500);
        let p = title_prompt("Subject", &long);
        assert!(p.contains(&"x".repeat(200)));
        assert!(!p.contains(&"x".repeat(201)));
    }
}
