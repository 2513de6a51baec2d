//! Ingestion orchestrator — drives one run of the pipeline.
//!
//! Candidates are processed independently and in sequence. A message counts
//! as processed only after its ledger record is inserted; any failure
//! between summarization and insertion leaves the candidate unmarked, so it
//! is retried on the next run.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactWriter;
use crate::error::{Error, Result};
use crate::filter::{matched_filters, RecipientFilterSet};
use crate::ledger::{ProcessedLedger, ProcessedRecord};
use crate::mail::message::MailboxMessage;
use crate::mail::session::{MailClient, MailSession};
use crate::msgid::canonical_message_id;
use crate::report::ReportSink;
use crate::summarizer::Summarizer;

/// Mode flags for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Restrict the candidate search to unread messages.
    pub unread_only: bool,
    /// Flag each newly processed message for deletion and expunge at the end.
    pub prune: bool,
}

/// Outcome counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Candidates returned by the search (post-cap).
    pub candidates: usize,
    /// Messages newly marked processed this run.
    pub processed: usize,
    /// Candidates skipped because the ledger already knew them.
    pub duplicates: usize,
    /// Candidates that failed fetch, summarization, or persistence.
    pub failed: usize,
    /// Messages flagged for deletion in prune mode.
    pub pruned: usize,
}

/// Orchestrates mail session, ledger, summarizer, artifact writer and
/// report sink for one run.
pub struct IngestPipeline {
    ledger: ProcessedLedger,
    filters: RecipientFilterSet,
    summarizer: Arc<dyn Summarizer>,
    artifacts: Arc<dyn ArtifactWriter>,
    report: Option<Arc<dyn ReportSink>>,
    max_candidates: usize,
}

impl IngestPipeline {
    pub fn new(
        ledger: ProcessedLedger,
        filters: RecipientFilterSet,
        summarizer: Arc<dyn Summarizer>,
        artifacts: Arc<dyn ArtifactWriter>,
        report: Option<Arc<dyn ReportSink>>,
        max_candidates: usize,
    ) -> Self {
        Self {
            ledger,
            filters,
            summarizer,
            artifacts,
            report,
            max_candidates,
        }
    }

    /// Run the ingestion pipeline over an established session.
    ///
    /// The session is logged out on every exit path, including storage
    /// failures that abort the run.
    pub async fn execute<S: MailSession>(
        &self,
        session: &mut S,
        options: RunOptions,
    ) -> Result<RunReport> {
        let mut client = MailClient::new(session, self.max_candidates);
        let outcome = self.run(&mut client, options).await;
        client.logout().await;
        outcome
    }

    async fn run<S: MailSession>(
        &self,
        client: &mut MailClient<S>,
        options: RunOptions,
    ) -> Result<RunReport> {
        let candidates = client
            .search_candidates(&self.filters, options.unread_only)
            .await;
        let mut report = RunReport {
            candidates: candidates.len(),
            ..RunReport::default()
        };
        info!(
            candidates = report.candidates,
            unread_only = options.unread_only,
            "Starting ingestion run"
        );

        for seq in candidates {
            let Some(message) = client.fetch_message(seq).await else {
                report.failed += 1;
                continue;
            };

            // Single default-resolution point for the optional Date header.
            let received = message.date.unwrap_or_else(Utc::now);
            let message_id = canonical_message_id(
                message.message_id.as_deref(),
                &message.subject,
                received,
                &message.from_joined(),
            );

            if self.ledger.exists(&message_id).map_err(Error::from)? {
                debug!(message_id = %message_id, "Already processed, skipping");
                report.duplicates += 1;
                continue;
            }

            let matched = matched_filters(&message, &self.filters);

            let artifact_ref = match self.process_candidate(&message, received, &matched).await {
                Ok(reference) => reference,
                Err(e) => {
                    error!(
                        subject = %message.subject,
                        message_id = %message_id,
                        error = %e,
                        "Candidate failed, will retry next run"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let record = ProcessedRecord {
                message_id: message_id.clone(),
                subject: message.subject.clone(),
                from_address: message.from_joined(),
                matched_recipients: matched.join(","),
                received_date: received,
                artifact_ref: Some(artifact_ref),
            };

            match self.ledger.insert(&record) {
                Ok(()) => {
                    info!(subject = %message.subject, message_id = %message_id, "Message processed");
                    report.processed += 1;
                    if options.prune {
                        report.pruned += client.delete_by_message_id(&message_id).await;
                    }
                }
                Err(e) if e.is_conflict() => {
                    // Raced or re-listed candidate; benign.
                    debug!(message_id = %message_id, "Record already present");
                    report.duplicates += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if report.processed > 0 {
            self.emit_report();
        }

        if options.prune {
            client.expunge().await;
        }

        info!(
            processed = report.processed,
            duplicates = report.duplicates,
            failed = report.failed,
            "Ingestion run complete"
        );
        Ok(report)
    }

    /// Summarize, title and persist one candidate. Any error here leaves
    /// the candidate unmarked.
    async fn process_candidate(
        &self,
        message: &MailboxMessage,
        received: chrono::DateTime<Utc>,
        matched: &[String],
    ) -> Result<String> {
        let summary = self.summarizer.summarize(&message.summary_input()).await?;
        let title = self.summarizer.title(&message.subject, &summary).await?;
        let reference = self
            .artifacts
            .save(message, received, &summary, &title, matched)?;
        Ok(reference)
    }

    fn emit_report(&self) {
        let Some(sink) = &self.report else {
            return;
        };
        match sink.generate() {
            Ok(path) => {
                if let Err(e) = sink.present(&path) {
                    warn!(error = %e, "Failed to present report");
                }
            }
            Err(e) => warn!(error = %e, "Failed to generate report"),
        }
    }

    /// Standalone prune: reconcile the mailbox against every id the ledger
    /// has ever recorded, independent of filters or unread state. Returns
    /// the number of messages flagged.
    pub async fn prune_all<S: MailSession>(&self, session: &mut S) -> Result<u64> {
        let mut client = MailClient::new(session, self.max_candidates);
        let outcome = self.run_prune(&mut client).await;
        client.logout().await;
        outcome
    }

    async fn run_prune<S: MailSession>(&self, client: &mut MailClient<S>) -> Result<u64> {
        let ids = self.ledger.all_ids().map_err(Error::from)?;
        info!(recorded = ids.len(), "Starting standalone prune");

        let mut flagged = 0u64;
        for id in ids {
            flagged += client.delete_by_message_id(&id).await as u64;
        }

        client.expunge().await;
        info!(flagged = flagged, "Prune complete");
        Ok(flagged)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
