//! Log-only mailer for development.

use async_trait::async_trait;

use crate::error::MailError;
use crate::{MailMessage, Mailer};

/// Writes a log line instead of sending. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "mail delivery disabled; message logged only"
        );
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "log"
    }
}
