use serde::Deserialize;
use thiserror::Error;

use security_cell::SecurityError;
use shared_models::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error(transparent)]
    Security(#[from] SecurityError),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::DatabaseError(msg) => AppError::Database(msg),
            AuthError::Security(e) => e.into(),
        }
    }
}
