use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_database::{SupabaseClient, SupabaseError};
use shared_models::auth::{Role, SessionUser};
use shared_models::user::DoctorSummary;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentRow, NewAppointment,
};

/// Reads and writes `appointments`, joining the assigned doctor onto every result.
pub struct AppointmentRepository {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Reception sees every appointment. A doctor sees only non-cancelled appointments
    /// assigned to them. Ordered by start ascending.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn list_for(&self, user: &SessionUser) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = "/rest/v1/appointments?select=*&order=appointment_date.asc".to_string();
        if user.role == Role::Doctor {
            path.push_str(&format!(
                "&assigned_doctor_id=eq.{}&status=neq.cancelled",
                user.id
            ));
        }

        let rows: Vec<AppointmentRow> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(database_error)?;

        debug!("Loaded {} appointments", rows.len());
        self.with_doctors(rows).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=*&limit=1", id);

        let rows: Vec<AppointmentRow> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(database_error)?;

        self.single(rows).await
    }

    #[instrument(skip(self, new))]
    pub async fn create(
        &self,
        new: &NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if new.appointment_date < now {
            return Err(AppointmentError::PastDate);
        }

        let rows: Vec<AppointmentRow> = self
            .supabase
            .mutate_returning(Method::POST, "/rest/v1/appointments", new.to_insert_row())
            .await
            .map_err(database_error)?;

        let appointment = self.single(rows).await.map_err(|e| match e {
            AppointmentError::NotFound => {
                AppointmentError::DatabaseError("Insert returned no row".to_string())
            }
            other => other,
        })?;

        info!("Created appointment {}", appointment.id);
        Ok(appointment)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: &AppointmentChanges,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if changes.appointment_date.is_some_and(|date| date < now) {
            return Err(AppointmentError::PastDate);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<AppointmentRow> = self
            .supabase
            .mutate_returning(Method::PATCH, &path, changes.to_update_row(now))
            .await
            .map_err(database_error)?;

        let appointment = self.single(rows).await?;
        info!("Updated appointment {}", appointment.id);
        Ok(appointment)
    }

    async fn single(&self, rows: Vec<AppointmentRow>) -> Result<Appointment, AppointmentError> {
        self.with_doctors(rows)
            .await?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }

    async fn with_doctors(
        &self,
        rows: Vec<AppointmentRow>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut ids: Vec<Uuid> = rows.iter().filter_map(|r| r.assigned_doctor_id).collect();
        ids.sort();
        ids.dedup();

        let doctors = self.doctor_summaries(&ids).await;

        Ok(rows
            .into_iter()
            .map(|row| {
                let doctor = row.assigned_doctor_id.and_then(|id| doctors.get(&id).cloned());
                Appointment::from_row(row, doctor)
            })
            .collect())
    }

    /// A failed lookup leaves `assignedDoctor` empty rather than failing the read.
    async fn doctor_summaries(&self, ids: &[Uuid]) -> HashMap<Uuid, DoctorSummary> {
        if ids.is_empty() {
            return HashMap::new();
        }

        let list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/users?select=id,name,email&id=in.({})", list);

        match self
            .supabase
            .request::<Vec<DoctorSummary>>(Method::GET, &path, None, None)
            .await
        {
            Ok(doctors) => doctors.into_iter().map(|d| (d.id, d)).collect(),
            Err(e) => {
                warn!("Doctor lookup failed: {}", e);
                HashMap::new()
            }
        }
    }
}

fn database_error(e: SupabaseError) -> AppointmentError {
    AppointmentError::DatabaseError(e.to_string())
}

