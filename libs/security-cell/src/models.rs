use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

impl From<SecurityError> for AppError {
    fn from(e: SecurityError) -> Self {
        AppError::Internal(e.to_string())
    }
}
