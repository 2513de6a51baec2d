//! Mail session client — IMAP protocol access and message parsing.

pub mod message;
pub mod session;

pub use message::MailboxMessage;
pub use session::{connect, ImapMailSession, MailClient, MailSession};
