//! Mail delivery errors.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The provider could not be reached or the request timed out.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The provider answered with a non-2xx status.
    #[error("mail provider rejected the message with {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The outbox was told to fail (tests).
    #[error("mail delivery unavailable: {0}")]
    Unavailable(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
