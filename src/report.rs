//! Report generation — a static HTML index over the artifact directory.
//!
//! The pipeline treats this as an opaque collaborator, invoked once per run
//! when at least one message was newly processed.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ReportError;

/// Report collaborator contract.
pub trait ReportSink: Send + Sync {
    /// Build the report and return its location.
    fn generate(&self) -> Result<PathBuf, ReportError>;

    /// Surface the report to the user.
    fn present(&self, report: &Path) -> Result<(), ReportError>;
}

/// Writes `index.html` linking every markdown artifact in the summaries
/// directory, newest filename first.
pub struct HtmlReport {
    summaries_dir: PathBuf,
}

impl HtmlReport {
    pub fn new(summaries_dir: impl Into<PathBuf>) -> Self {
        Self {
            summaries_dir: summaries_dir.into(),
        }
    }

    fn artifact_names(&self) -> Result<Vec<String>, ReportError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.summaries_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".md") {
                names.push(name);
            }
        }
        names.sort();
        names.reverse();
        Ok(names)
    }
}

impl ReportSink for HtmlReport {
    fn generate(&self) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.summaries_dir)?;
        let names = self.artifact_names()?;

        let items: String = names
            .iter()
            .map(|n| format!("    <li><a href=\"{n}\">{n}</a></li>\n"))
            .collect();

        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n\
             <meta charset=\"utf-8\">\n<title>Inbox Digest</title>\n\
             </head>\n<body>\n<h1>Inbox Digest</h1>\n\
             <ul>\n{items}</ul>\n</body>\n</html>\n"
        );

        let path = self.summaries_dir.join("index.html");
        std::fs::write(&path, html)?;
        Ok(path)
    }

    fn present(&self, report: &Path) -> Result<(), ReportError> {
        info!(report = %report.display(), "Digest report ready");
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_indexes_markdown_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("2025-03-14_a.md"), "x").unwrap();
        std::fs::write(tmp.path().join("2025-03-15_b.md"), "x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let report = HtmlReport::new(tmp.path());
        let path = report.generate().unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("2025-03-14_a.md"));
        assert!(html.contains("2025-03-15_b.md"));
        assert!(!html.contains("notes.txt"));
        // Newest first.
        assert!(html.find("2025-03-15_b.md").unwrap() < html.find("2025-03-14_a.md").unwrap());
    }

    #[test]
    fn generate_on_missing_dir_creates_empty_index() {
        let tmp = tempfile::tempdir().unwrap();
        let report = HtmlReport::new(tmp.path().join("missing"));
        let path = report.generate().unwrap();
        assert!(path.exists());
    }
}
