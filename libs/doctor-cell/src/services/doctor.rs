use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use security_cell::PasswordSecurityService;
use shared_database::{SupabaseClient, SupabaseError};
use shared_models::user::DoctorSummary;

use crate::models::{DoctorChanges, DoctorError, NewDoctor};

/// Doctor accounts are `users` rows with `role = doctor`.
pub struct DoctorService {
    supabase: Arc<SupabaseClient>,
}

impl DoctorService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn list_doctors(&self) -> Result<Vec<DoctorSummary>, DoctorError> {
        self.supabase
            .request(
                Method::GET,
                "/rest/v1/users?role=eq.doctor&select=id,name,email&order=name.asc",
                None,
                None,
            )
            .await
            .map_err(database_error)
    }

    #[instrument(skip(self, doctor), fields(email = %doctor.email))]
    pub async fn create_doctor(&self, doctor: &NewDoctor) -> Result<DoctorSummary, DoctorError> {
        if self.email_taken(&doctor.email, None).await? {
            debug!("Refusing duplicate doctor email");
            return Err(DoctorError::EmailTaken);
        }

        let hash = PasswordSecurityService::hash_password(&doctor.password)?;
        let rows: Vec<DoctorSummary> = self
            .supabase
            .mutate_returning(
                Method::POST,
                "/rest/v1/users?select=id,name,email",
                doctor.to_insert_row(&hash),
            )
            .await
            .map_err(database_error)?;

        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Insert returned no row".to_string()))?;

        info!("Created doctor account {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_doctor(
        &self,
        id: Uuid,
        changes: &DoctorChanges,
    ) -> Result<DoctorSummary, DoctorError> {
        self.ensure_doctor(id).await?;

        if let Some(email) = &changes.email {
            if self.email_taken(email, Some(id)).await? {
                return Err(DoctorError::EmailTaken);
            }
        }

        let hash = changes
            .password
            .as_deref()
            .map(PasswordSecurityService::hash_password)
            .transpose()?;

        let path = format!("/rest/v1/users?id=eq.{}&select=id,name,email", id);
        let rows: Vec<DoctorSummary> = self
            .supabase
            .mutate_returning(
                Method::PATCH,
                &path,
                changes.to_update_row(hash.as_deref(), Utc::now()),
            )
            .await
            .map_err(database_error)?;

        rows.into_iter().next().ok_or(DoctorError::NotFound)
    }

    /// Unassigns the doctor's appointments, then removes the account.
    #[instrument(skip(self))]
    pub async fn delete_doctor(&self, id: Uuid) -> Result<(), DoctorError> {
        self.ensure_doctor(id).await?;

        self.supabase
            .execute(
                Method::PATCH,
                &format!("/rest/v1/appointments?assigned_doctor_id=eq.{}", id),
                Some(json!({ "assigned_doctor_id": null, "updated_at": Utc::now() })),
            )
            .await
            .map_err(database_error)?;

        self.supabase
            .execute(Method::DELETE, &format!("/rest/v1/users?id=eq.{}", id), None)
            .await
            .map_err(database_error)?;

        info!("Deleted doctor account {}", id);
        Ok(())
    }

    async fn ensure_doctor(&self, id: Uuid) -> Result<(), DoctorError> {
        let path = format!("/rest/v1/users?id=eq.{}&role=eq.doctor&select=id&limit=1", id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(database_error)?;

        if rows.is_empty() {
            return Err(DoctorError::NotFound);
        }
        Ok(())
    }

    /// Whether any user other than `except` already owns `email`.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, DoctorError> {
        let mut path = format!(
            "/rest/v1/users?email=eq.{}&select=id&limit=1",
            urlencoding::encode(email)
        );
        if let Some(id) = except {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(database_error)?;

        Ok(!rows.is_empty())
    }
}

fn database_error(e: SupabaseError) -> DoctorError {
    match e {
        SupabaseError::Conflict(_) => DoctorError::EmailTaken,
        other => DoctorError::DatabaseError(other.to_string()),
    }
}
