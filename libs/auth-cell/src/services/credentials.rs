use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, instrument, warn};

use security_cell::PasswordSecurityService;
use shared_database::SupabaseClient;
use shared_models::user::UserRecord;

use crate::models::AuthError;

pub struct CredentialService {
    supabase: Arc<SupabaseClient>,
}

impl CredentialService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// The account matching `email` and `password`. Unknown email, missing password and wrong
    /// password are all `None`.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let path = format!(
            "/rest/v1/users?email=eq.{}&password=not.is.null&select=id,email,name,password,role&limit=1",
            urlencoding::encode(email)
        );

        let users: Vec<UserRecord> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let Some(user) = users.into_iter().next() else {
            debug!("No account with a password for this email");
            return Ok(None);
        };
        let Some(hash) = user.password.as_deref() else {
            return Ok(None);
        };

        match PasswordSecurityService::verify_password(password, hash) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(e) => {
                warn!("Unreadable password hash for user {}: {}", user.id, e);
                Ok(None)
            }
        }
    }
}
