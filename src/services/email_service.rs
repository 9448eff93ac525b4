use reqwest::Client;
use serde_json::json;

use crate::error::{Error, Result};

/// Thin client for the outbound email provider. Email is never on the
/// critical path: callers dispatch sends on a spawned task and log the
/// failure.
#[derive(Clone)]
pub struct EmailService {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl EmailService {
    pub fn new(client: Client, api_url: String, api_key: String, from: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
            from,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        if to.is_empty() || !to.contains('@') {
            return Err(Error::BadRequest(format!("Invalid email address: {}", to)));
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "Email provider returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        tracing::info!(to, subject, "email sent");
        Ok(())
    }

    /// Fire-and-forget dispatch used after a primary write commits.
    pub fn send_in_background(&self, to: String, subject: String, html: String) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &html).await {
                tracing::error!(error = ?e, to, "background email failed");
            }
        });
    }
}
