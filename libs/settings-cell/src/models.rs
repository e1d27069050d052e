use serde::{Deserialize, Serialize};
use thiserror::Error;

use security_cell::{PasswordSecurityService, SecurityError};
use shared_models::error::AppError;

pub const NO_PASSWORD_MESSAGE: &str = "User not found or has no password set.";
pub const WRONG_PASSWORD_MESSAGE: &str = "Current password is incorrect.";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    /// Reports the first failed check.
    pub fn validate(self) -> Result<PasswordChange, SettingsError> {
        let current_password = self.current_password.unwrap_or_default();
        if current_password.is_empty() {
            return Err(SettingsError::Validation(
                "Current password is required".to_string(),
            ));
        }

        let new_password = self.new_password.unwrap_or_default();
        if !PasswordSecurityService::meets_minimum_length(&new_password) {
            return Err(SettingsError::Validation(
                "New password must be at least 8 characters".to_string(),
            ));
        }

        Ok(PasswordChange {
            current_password,
            new_password,
        })
    }
}

/// Calendar connection state shown on the settings page. Never carries tokens.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutlookStatus {
    pub configured: bool,
    pub connected: bool,
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", NO_PASSWORD_MESSAGE)]
    NoPassword,

    #[error("{}", WRONG_PASSWORD_MESSAGE)]
    WrongPassword,

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<SettingsError> for AppError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::Validation(msg) => AppError::ValidationError(msg),
            SettingsError::NoPassword => AppError::NotFound(NO_PASSWORD_MESSAGE.to_string()),
            SettingsError::WrongPassword => AppError::BadRequest(WRONG_PASSWORD_MESSAGE.to_string()),
            SettingsError::Security(inner) => inner.into(),
            SettingsError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
