// =====================================================================================
// PASSWORD SECURITY SERVICE - ARGON2 HASHING
// =====================================================================================

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use tracing::{debug, instrument};

use crate::models::SecurityError;

/// Minimum length for any password set through the portal.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct PasswordSecurityService;

impl PasswordSecurityService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, SecurityError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SecurityError::Hashing(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// `Ok(false)` on a mismatch; `Err` only when `hash` is not a PHC string.
    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, SecurityError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| SecurityError::MalformedHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password mismatch");
                Ok(false)
            }
            Err(e) => Err(SecurityError::MalformedHash(e.to_string())),
        }
    }

    pub fn meets_minimum_length(password: &str) -> bool {
        password.chars().count() >= MIN_PASSWORD_LENGTH
    }
}
