//! HTTP mail provider client.
//!
//! Speaks the Resend `POST /emails` API: a JSON body with `from`, `to`,
//! `subject` and `html`, authorized with a bearer key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigError, MailConfig};
use crate::error::MailError;
use crate::{MailMessage, Mailer};

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Delivers mail through an HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    endpoint_url: Url,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.as_str()))
            .map_err(|_| ConfigError::InvalidApiKey)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| MailError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            endpoint_url: config.emails_endpoint(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let endpoint = "POST /emails";
        let body = SendEmailRequest {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let resp = self
            .http
            .post(self.endpoint_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "mail provider rejected message");
            return Err(MailError::Rejected { status, body });
        }

        let id = resp
            .json::<SendEmailResponse>()
            .await
            .ok()
            .and_then(|r| r.id);
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            provider_id = id.as_deref().unwrap_or("-"),
            "email sent"
        );
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}
