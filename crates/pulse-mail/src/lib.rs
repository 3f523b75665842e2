//! # pulse-mail: Transactional Email
//!
//! Every email Pulse sends goes through the [`Mailer`] trait:
//!
//! - [`HttpMailer`] posts to a Resend-compatible `/emails` endpoint.
//! - [`LogMailer`] only logs; used when no provider key is configured.
//! - [`Outbox`] records messages in memory for tests.
//!
//! Message bodies are built by the functions in [`templates`].

pub mod config;
pub mod error;
pub mod http;
pub mod log;
pub mod outbox;
pub mod templates;

pub use config::{ConfigError, MailConfig};
pub use error::MailError;
pub use http::HttpMailer;
pub use log::LogMailer;
pub use outbox::Outbox;

use async_trait::async_trait;
use pulse_core::EmailAddress;

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: EmailAddress,
    pub subject: String,
    pub html: String,
}

/// Sends transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;

    /// Short name of the delivery mode, reported by diagnostics.
    fn kind(&self) -> &'static str;
}
