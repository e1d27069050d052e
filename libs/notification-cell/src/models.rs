use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;

// =====================================================================================
// DELIVERY MODELS
// =====================================================================================

/// Outcome of a delivery attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Provider credentials are not set; nothing was attempted.
    NotConfigured,
    /// The target user has no calendar connected.
    NotConnected,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    /// Raw number as the patient typed it; normalized before sending.
    pub to: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub body: Option<String>,
}

// =====================================================================================
// MICROSOFT IDENTITY MODELS
// =====================================================================================

/// Token endpoint response. Either token may be missing.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Complete grant from an authorization-code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoredTokens {
    pub microsoft_access_token: Option<String>,
    pub microsoft_refresh_token: Option<String>,
    pub microsoft_token_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphEvent {
    pub id: Option<String>,
}

// =====================================================================================
// ERROR TYPES
// =====================================================================================

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Provider is not configured")]
    NotConfigured,

    #[error("Provider rejected request ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Token response did not include both tokens")]
    MissingTokens,

    #[error("Token response has an out-of-range expires_in: {0}")]
    InvalidExpiry(i64),

    #[error("No phone number in '{0}'")]
    InvalidRecipient(String),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<NotificationError> for AppError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::Storage(msg) => AppError::Database(msg),
            NotificationError::NotConfigured => {
                AppError::BadRequest("Outlook integration is not configured".to_string())
            }
            other => AppError::ExternalService(other.to_string()),
        }
    }
}
