use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{Delivery, EmailMessage, NotificationError};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, NotificationError>;
}

/// Resend transactional email API.
/// POST {base}/emails
pub struct ResendEmailClient {
    client: Client,
    api_key: String,
    base_url: String,
    from: String,
}

impl ResendEmailClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.resend_api_key.clone(),
            base_url: config.resend_base_url.trim_end_matches('/').to_string(),
            from: config.email_from.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl EmailSender for ResendEmailClient {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, NotificationError> {
        if !self.is_configured() {
            debug!("Email not configured, skipping '{}'", message.subject);
            return Ok(Delivery::NotConfigured);
        }

        let url = format!("{}/emails", self.base_url);
        let body = json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Resend send failed: {} - {}", status, text);
            return Err(NotificationError::Provider {
                status: status.as_u16(),
                message: text,
            });
        }

        info!("Email '{}' sent to {} recipient(s)", message.subject, message.to.len());
        Ok(Delivery::Sent)
    }
}
