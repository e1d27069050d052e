use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{Delivery, NotificationError, SmsMessage};

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, message: &SmsMessage) -> Result<Delivery, NotificationError>;
}

/// Formats a phone number as E.164, assuming US numbers when no country code is given.
/// `None` when the input holds no digits at all.
pub fn normalize_e164(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        0 => None,
        10 => Some(format!("+1{}", digits)),
        // `1XXXXXXXXXX` and numbers already carrying a country code only need the `+`.
        _ => Some(format!("+{}", digits)),
    }
}

/// Twilio Programmable Messaging.
/// POST {base}/Accounts/{sid}/Messages.json
pub struct TwilioSmsClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioSmsClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_phone_number.clone(),
            base_url: config.twilio_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

#[async_trait]
impl SmsSender for TwilioSmsClient {
    async fn send(&self, message: &SmsMessage) -> Result<Delivery, NotificationError> {
        if !self.is_configured() {
            debug!("SMS not configured, skipping message");
            return Ok(Delivery::NotConfigured);
        }

        let to = normalize_e164(&message.to)
            .ok_or_else(|| NotificationError::InvalidRecipient(message.to.clone()))?;
        let url = format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid);
        let form = [
            ("To", to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Twilio send failed: {} - {}", status, text);
            return Err(NotificationError::Provider {
                status: status.as_u16(),
                message: text,
            });
        }

        info!("SMS sent to {}", to);
        Ok(Delivery::Sent)
    }
}
