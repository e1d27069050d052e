use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use security_cell::{PasswordSecurityService, SecurityError, ValidationService};
use shared_models::error::AppError;
use shared_models::user::normalize_email;

pub const EMAIL_TAKEN_MESSAGE: &str = "A user with this email already exists.";

const NAME_REQUIRED: &str = "Name is required";
const INVALID_EMAIL: &str = "Invalid email";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDoctorRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoctorRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Validated create payload. The email is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl CreateDoctorRequest {
    /// Every failed check, joined into one message.
    pub fn validate(self) -> Result<NewDoctor, DoctorError> {
        let mut problems = Vec::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            problems.push(NAME_REQUIRED);
        }
        let email = normalize_email(self.email.as_deref().unwrap_or_default());
        if !ValidationService::validate_email(&email) {
            problems.push(INVALID_EMAIL);
        }
        let password = self.password.unwrap_or_default();
        if !PasswordSecurityService::meets_minimum_length(&password) {
            problems.push(PASSWORD_TOO_SHORT);
        }

        if !problems.is_empty() {
            return Err(DoctorError::ValidationError(problems.join(" ")));
        }

        Ok(NewDoctor {
            name: name.to_string(),
            email,
            password,
        })
    }
}

impl UpdateDoctorRequest {
    pub fn validate(self) -> Result<DoctorChanges, DoctorError> {
        let mut problems = Vec::new();

        let name = self.name.map(|n| n.trim().to_string());
        if name.as_deref().is_some_and(str::is_empty) {
            problems.push(NAME_REQUIRED);
        }
        let email = self.email.as_deref().map(normalize_email);
        if email
            .as_deref()
            .is_some_and(|e| !ValidationService::validate_email(e))
        {
            problems.push(INVALID_EMAIL);
        }
        if self
            .password
            .as_deref()
            .is_some_and(|p| !PasswordSecurityService::meets_minimum_length(p))
        {
            problems.push(PASSWORD_TOO_SHORT);
        }

        if !problems.is_empty() {
            return Err(DoctorError::ValidationError(problems.join(" ")));
        }

        Ok(DoctorChanges {
            name,
            email,
            password: self.password,
        })
    }
}

impl NewDoctor {
    pub fn to_insert_row(&self, password_hash: &str) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "password": password_hash,
            "role": "doctor",
        })
    }
}

impl DoctorChanges {
    /// Columns to write. The password arrives already hashed.
    pub fn to_update_row(&self, password_hash: Option<&str>, now: DateTime<Utc>) -> Value {
        let mut row = Map::new();
        if let Some(name) = &self.name {
            row.insert("name".to_string(), json!(name));
        }
        if let Some(email) = &self.email {
            row.insert("email".to_string(), json!(email));
        }
        if let Some(hash) = password_hash {
            row.insert("password".to_string(), json!(hash));
        }
        row.insert("updated_at".to_string(), json!(now));
        Value::Object(row)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("{}", EMAIL_TAKEN_MESSAGE)]
    EmailTaken,

    #[error("{0}")]
    ValidationError(String),

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::EmailTaken => AppError::Conflict(EMAIL_TAKEN_MESSAGE.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::Security(inner) => inner.into(),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
