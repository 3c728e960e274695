//! Outbound email dispatch.
//!
//! The scanner makes at most one delivery attempt per detected deadline
//! and never retries; callers log failures and move on.

use crate::config::EmailConfig;
use async_trait::async_trait;
use serde_json::json;

/// Outbound email capability.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Deliver one email. Transport problems and rejected requests are
    /// errors; the caller decides what to do with them.
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        task_title: &str,
    ) -> anyhow::Result<()>;
}

/// Dispatcher backed by an HTTP mail API.
///
/// Posts one JSON document per message to the configured endpoint with
/// optional bearer authentication; any non-2xx response is a failure.
pub struct HttpEmailDispatcher {
    endpoint: String,
    from_address: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl HttpEmailDispatcher {
    /// Create a dispatcher from the mail section of the config.
    #[must_use]
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            from_address: config.from_address.clone(),
            bearer_token: config.bearer_token.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmailDispatcher for HttpEmailDispatcher {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        task_title: &str,
    ) -> anyhow::Result<()> {
        if self.endpoint.trim().is_empty() {
            anyhow::bail!("mail API endpoint is not configured");
        }

        let body = json!({
            "from": self.from_address,
            "to": to,
            "subject": subject,
            "html_body": html_body,
            "task_title": task_title,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("mail API rejected message ({status}): {body}");
        }
        Ok(())
    }
}
