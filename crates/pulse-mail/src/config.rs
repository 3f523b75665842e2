//! Mail provider configuration.

use url::Url;
use zeroize::Zeroizing;

/// Default provider endpoint.
pub const DEFAULT_API_URL: &str = "https://api.resend.com";

/// Default sender address.
pub const DEFAULT_FROM: &str = "onboarding@resend.dev";

/// Configuration for the HTTP mail provider.
///
/// Custom `Debug` redacts the API key.
#[derive(Clone)]
pub struct MailConfig {
    /// Provider base URL. Messages are posted to `{api_url}/emails`.
    pub api_url: Url,
    pub api_key: Zeroizing<String>,
    /// The `from` address on every message.
    pub from: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MailConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MAIL_API_KEY` (required)
    /// - `MAIL_API_URL` (default: `https://api.resend.com`)
    /// - `MAIL_FROM` (default: `onboarding@resend.dev`)
    /// - `MAIL_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("MAIL_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_url: env_url("MAIL_API_URL", DEFAULT_API_URL)?,
            api_key: Zeroizing::new(api_key),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_FROM.to_string()),
            timeout_secs: std::env::var("MAIL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        })
    }

    /// Point at a local mock server.
    pub fn local_mock(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            api_key: Zeroizing::new(api_key.to_string()),
            from: DEFAULT_FROM.to_string(),
            timeout_secs: 5,
        })
    }

    /// The send endpoint, `emails` appended to the base path whether or not
    /// it ends in a slash.
    pub fn emails_endpoint(&self) -> Url {
        let mut url = self.api_url.clone();
        let path = format!("{}/emails", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MAIL_API_KEY environment variable is required for the HTTP mailer")]
    MissingApiKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid API key header value")]
    InvalidApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_key() {
        let cfg = MailConfig::local_mock("http://127.0.0.1:9999", "re_secret_key").unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("re_secret_key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn env_url_falls_back_to_default() {
        let url = env_url("PULSE_TEST_UNSET_MAIL_URL", DEFAULT_API_URL).unwrap();
        assert_eq!(url.as_str(), "https://api.resend.com/");
    }

    #[test]
    fn emails_endpoint_keeps_base_path() {
        let cases = [
            ("https://api.resend.com", "https://api.resend.com/emails"),
            ("https://proxy.example/v1", "https://proxy.example/v1/emails"),
            ("https://proxy.example/v1/", "https://proxy.example/v1/emails"),
        ];
        for (base, expected) in cases {
            let cfg = MailConfig::local_mock(base, "k").unwrap();
            assert_eq!(cfg.emails_endpoint().as_str(), expected, "base {base}");
        }
    }

    #[test]
    fn local_mock_rejects_garbage() {
        assert!(MailConfig::local_mock("not a url", "k").is_err());
    }
}
