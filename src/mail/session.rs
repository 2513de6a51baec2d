//! IMAP session client — connection, candidate search, fetch, flag-delete.
//!
//! The raw protocol operations live behind the [`MailSession`] trait so the
//! composition logic above it (search union, cap truncation, delete by
//! Message-ID) is testable against a scripted session. `ImapMailSession` is
//! the real implementation over async-imap.

use std::collections::BTreeSet;

use async_imap::Session;
use async_native_tls::TlsStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

use crate::config::ImapConfig;
use crate::error::MailError;
use crate::filter::RecipientFilterSet;
use crate::mail::message::MailboxMessage;
use crate::msgid::normalize_message_id;

/// Recipient header fields searched per filter.
const SEARCH_FIELDS: [&str; 3] = ["TO", "CC", "BCC"];

// An IMAP session is generic over the stream type — here TLS-encrypted TCP
// wrapped in a tokio compat layer.
pub type ImapSession = Session<Compat<TlsStream<TcpStream>>>;

/// Raw protocol operations of one selected-folder IMAP session.
#[async_trait]
pub trait MailSession: Send {
    /// Issue one SEARCH and return matching sequence numbers.
    async fn search(&mut self, query: &str) -> Result<Vec<u32>, MailError>;

    /// Fetch the raw RFC822 bytes of one message.
    async fn fetch_raw(&mut self, seq: u32) -> Result<Option<Vec<u8>>, MailError>;

    /// Flag one message `\Deleted`.
    async fn flag_deleted(&mut self, seq: u32) -> Result<(), MailError>;

    /// Permanently remove all flagged messages.
    async fn expunge(&mut self) -> Result<(), MailError>;

    /// Log out and release the session.
    async fn logout(&mut self) -> Result<(), MailError>;
}

#[async_trait]
impl<S: MailSession + ?Sized> MailSession for &mut S {
    async fn search(&mut self, query: &str) -> Result<Vec<u32>, MailError> {
        (**self).search(query).await
    }

    async fn fetch_raw(&mut self, seq: u32) -> Result<Option<Vec<u8>>, MailError> {
        (**self).fetch_raw(seq).await
    }

    async fn flag_deleted(&mut self, seq: u32) -> Result<(), MailError> {
        (**self).flag_deleted(seq).await
    }

    async fn expunge(&mut self) -> Result<(), MailError> {
        (**self).expunge().await
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        (**self).logout().await
    }
}

/// Real IMAP session over async-imap.
pub struct ImapMailSession {
    session: ImapSession,
}

/// Connect, authenticate and select the configured folder.
///
/// Any failure here is fatal for the run.
pub async fn connect(config: &ImapConfig) -> Result<ImapMailSession, MailError> {
    let host = config.host.as_str();

    let tcp = TcpStream::connect((host, config.port))
        .await
        .map_err(|e| MailError::Connection {
            host: config.host.clone(),
            port: config.port,
            reason: format!("TCP connect failed: {e}"),
        })?;

    let tls = async_native_tls::TlsConnector::new();
    let tls_stream = tls
        .connect(host, tcp)
        .await
        .map_err(|e| MailError::Connection {
            host: config.host.clone(),
            port: config.port,
            reason: format!("TLS handshake failed: {e}"),
        })?;

    let client = async_imap::Client::new(tls_stream.compat());

    let mut session = client
        .login(&config.username, config.password.expose_secret())
        .await
        .map_err(|(e, _)| MailError::Auth {
            username: config.username.clone(),
            reason: e.to_string(),
        })?;

    session
        .select(&config.folder)
        .await
        .map_err(|e| MailError::Select {
            folder: config.folder.clone(),
            reason: e.to_string(),
        })?;

    info!(host = %config.host, folder = %config.folder, "IMAP session established");
    Ok(ImapMailSession { session })
}

#[async_trait]
impl MailSession for ImapMailSession {
    async fn search(&mut self, query: &str) -> Result<Vec<u32>, MailError> {
        let ids = self
            .session
            .search(query)
            .await
            .map_err(|e| MailError::Search(format!("{query}: {e}")))?;
        Ok(ids.into_iter().collect())
    }

    async fn fetch_raw(&mut self, seq: u32) -> Result<Option<Vec<u8>>, MailError> {
        let to_fetch_err = |e: async_imap::error::Error| MailError::Fetch {
            seq,
            reason: e.to_string(),
        };
        let stream = self
            .session
            .fetch(seq.to_string(), "RFC822")
            .await
            .map_err(to_fetch_err)?;
        let fetches: Vec<_> = stream.try_collect().await.map_err(to_fetch_err)?;
        Ok(fetches
            .into_iter()
            .next()
            .and_then(|f| f.body().map(|b| b.to_vec())))
    }

    async fn flag_deleted(&mut self, seq: u32) -> Result<(), MailError> {
        let to_flag_err = |e: async_imap::error::Error| MailError::Flag {
            seq,
            reason: e.to_string(),
        };
        let stream = self
            .session
            .store(seq.to_string(), "+FLAGS (\\Deleted)")
            .await
            .map_err(to_flag_err)?;
        let _updates: Vec<_> = stream.try_collect().await.map_err(to_flag_err)?;
        Ok(())
    }

    async fn expunge(&mut self) -> Result<(), MailError> {
        let stream = self
            .session
            .expunge()
            .await
            .map_err(|e| MailError::Expunge(e.to_string()))?;
        let _removed: Vec<u32> = stream
            .try_collect()
            .await
            .map_err(|e| MailError::Expunge(e.to_string()))?;
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        self.session
            .logout()
            .await
            .map_err(|e| MailError::Logout(e.to_string()))
    }
}

/// Session client layering search composition, parsing and delete-by-id
/// over the raw protocol operations.
pub struct MailClient<S: MailSession> {
    session: S,
    max_candidates: usize,
}

impl<S: MailSession> MailClient<S> {
    pub fn new(session: S, max_candidates: usize) -> Self {
        Self {
            session,
            max_candidates,
        }
    }

    /// Search for candidate messages addressed to any configured filter.
    ///
    /// Compound boolean queries are unreliable across servers, so each
    /// `(filter, field)` pair gets its own single-field SEARCH and the
    /// results are unioned client-side. A failing individual search is
    /// logged and treated as empty — the overall search never aborts.
    ///
    /// Results are deduplicated, sorted ascending, and truncated to the
    /// most recent `max_candidates`.
    pub async fn search_candidates(
        &mut self,
        filters: &RecipientFilterSet,
        unread_only: bool,
    ) -> Vec<u32> {
        let mut hits: BTreeSet<u32> = BTreeSet::new();

        for filter in filters.iter() {
            for field in SEARCH_FIELDS {
                let query = if unread_only {
                    format!("UNSEEN {field} \"{filter}\"")
                } else {
                    format!("{field} \"{filter}\"")
                };
                match self.session.search(&query).await {
                    Ok(ids) => hits.extend(ids),
                    Err(e) => warn!(query = %query, error = %e, "Recipient search failed"),
                }
            }
        }

        let mut seqs: Vec<u32> = hits.into_iter().collect();
        if seqs.len() > self.max_candidates {
            // Keep the tail: highest sequence numbers are the most recent.
            seqs = seqs.split_off(seqs.len() - self.max_candidates);
        }
        debug!(candidates = seqs.len(), "Candidate search complete");
        seqs
    }

    /// Fetch and parse one message. Fetch or parse failures are logged and
    /// yield `None` — the candidate is skipped, not fatal to the batch.
    pub async fn fetch_message(&mut self, seq: u32) -> Option<MailboxMessage> {
        let raw = match self.session.fetch_raw(seq).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!(seq = seq, "FETCH returned no body");
                return None;
            }
            Err(e) => {
                warn!(seq = seq, error = %e, "FETCH failed");
                return None;
            }
        };

        match MailboxMessage::parse(seq, &raw) {
            Some(msg) => Some(msg),
            None => {
                warn!(seq = seq, "Message could not be parsed");
                None
            }
        }
    }

    /// Flag every message carrying the given Message-ID for deletion.
    ///
    /// Servers disagree on whether the indexed header value keeps its angle
    /// brackets, so both forms are searched and the hit sets unioned.
    /// Returns the number of messages flagged; errors are logged and
    /// contribute nothing.
    pub async fn delete_by_message_id(&mut self, message_id: &str) -> usize {
        let bare = normalize_message_id(message_id);
        if bare.is_empty() {
            return 0;
        }
        let bracketed = format!("<{bare}>");

        let mut seqs: BTreeSet<u32> = BTreeSet::new();
        for form in [bracketed.as_str(), bare.as_str()] {
            let query = format!("HEADER Message-ID \"{form}\"");
            match self.session.search(&query).await {
                Ok(ids) => seqs.extend(ids),
                Err(e) => warn!(message_id = %bare, error = %e, "Message-ID search failed"),
            }
        }

        let mut flagged = 0;
        for seq in seqs {
            match self.session.flag_deleted(seq).await {
                Ok(()) => flagged += 1,
                Err(e) => warn!(seq = seq, error = %e, "Failed to flag message deleted"),
            }
        }
        flagged
    }

    /// Permanently remove flagged messages. Best-effort.
    pub async fn expunge(&mut self) {
        if let Err(e) = self.session.expunge().await {
            warn!(error = %e, "EXPUNGE failed");
        }
    }

    /// Release the session. Best-effort, safe to call on every exit path.
    pub async fn logout(&mut self) {
        if let Err(e) = self.session.logout().await {
            warn!(error = %e, "LOGOUT failed");
        }
    }
}

// ── Scripted session for tests ──────────────────────────────────────


// ── Tests ───────────────────────────────────────────────────────────
