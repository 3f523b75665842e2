//! In-memory recording mailer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::MailError;
use crate::{MailMessage, Mailer};

/// Records every message it is asked to send.
///
/// Clones share the same recording, so a test can keep one handle and give
/// another to the application.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    failing: Arc<AtomicBool>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().clone()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Unavailable("outbox set to fail".into()));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "outbox"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::EmailAddress;

    fn message() -> MailMessage {
        MailMessage {
            to: EmailAddress::parse("a@example.com").unwrap(),
            subject: "hi".into(),
            html: "<p>hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn records_and_shares_between_clones() {
        let outbox = Outbox::new();
        let handle = outbox.clone();
        outbox.send(&message()).await.unwrap();
        assert_eq!(handle.sent(), vec![message()]);
    }

    #[tokio::test]
    async fn failing_outbox_records_nothing() {
        let outbox = Outbox::new();
        outbox.set_failing(true);
        assert!(outbox.send(&message()).await.is_err());
        assert!(outbox.sent().is_empty());
    }
}
