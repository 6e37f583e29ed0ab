use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),
}

/// Outbound notification seam. Dispatch is best-effort from the lifecycle's
/// point of view: a failed send never rolls back a committed transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
    ) -> Result<(), NotificationError>;
}

/// Posts messages to the transactional mail API.
pub struct HttpMailNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl HttpMailNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from_address: config.mail_from_address.clone(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailNotifier {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body_html: &str,
    ) -> Result<(), NotificationError> {
        if self.api_url.is_empty() {
            return Err(NotificationError::Dispatch(
                "mail API is not configured".to_string(),
            ));
        }

        let body = json!({
            "from": self.from_address,
            "to": recipient,
            "subject": subject,
            "html": body_html,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Dispatch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Mail API error ({}): {}", status, error_text);
            return Err(NotificationError::Dispatch(format!(
                "mail API returned {}",
                status
            )));
        }

        debug!("Notification '{}' dispatched to {}", subject, recipient);
        Ok(())
    }
}
