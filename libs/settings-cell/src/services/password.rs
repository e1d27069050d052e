use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use security_cell::PasswordSecurityService;
use shared_database::SupabaseClient;

use crate::models::{PasswordChange, SettingsError};

#[derive(Debug, Deserialize)]
struct PasswordRow {
    password: Option<String>,
}

/// Changes the signed-in user's own password.
pub struct AccountPasswordService {
    supabase: Arc<SupabaseClient>,
}

impl AccountPasswordService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    #[instrument(skip(self, change))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        change: &PasswordChange,
    ) -> Result<(), SettingsError> {
        let path = format!("/rest/v1/users?id=eq.{}&select=password&limit=1", user_id);
        let rows: Vec<PasswordRow> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;

        let Some(hash) = rows.into_iter().next().and_then(|r| r.password) else {
            return Err(SettingsError::NoPassword);
        };

        let matches = PasswordSecurityService::verify_password(&change.current_password, &hash)
            .unwrap_or_else(|e| {
                warn!("Unreadable password hash for user {}: {}", user_id, e);
                false
            });
        if !matches {
            return Err(SettingsError::WrongPassword);
        }

        let new_hash = PasswordSecurityService::hash_password(&change.new_password)?;
        self.supabase
            .execute(
                Method::PATCH,
                &format!("/rest/v1/users?id=eq.{}", user_id),
                Some(json!({ "password": new_hash, "updated_at": Utc::now() })),
            )
            .await
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;

        info!("Password changed for user {}", user_id);
        Ok(())
    }
}
