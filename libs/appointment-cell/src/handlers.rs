// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{Role, SessionUser};
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{Appointment, AppointmentError};
use crate::services::{AppointmentLifecycleService, AppointmentNotifier, AppointmentRepository};
use crate::validation::{parse_appointment_changes, parse_new_appointment};

fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))
}

/// Unparseable ids cannot match a row.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppointmentError::NotFound.into())
}

// ==============================================================================
// READS
// ==============================================================================

pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    AppointmentLifecycleService::new(state.supabase.clone())
        .auto_complete_past_due(Utc::now())
        .await;

    let appointments = AppointmentRepository::new(state.supabase.clone())
        .list_for(&user)
        .await?;

    Ok(Json(appointments))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let id = parse_id(&appointment_id)?;
    let appointment = AppointmentRepository::new(state.supabase.clone())
        .get(id)
        .await?;

    if user.role == Role::Doctor && appointment.assigned_doctor_id != Some(user.id) {
        debug!("Doctor {} denied access to appointment {}", user.id, id);
        return Err(AppointmentError::Forbidden.into());
    }

    Ok(Json(appointment))
}

// ==============================================================================
// WRITES (RECEPTION ONLY)
// ==============================================================================

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Extension(notifier): Extension<Arc<AppointmentNotifier>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    user.require_reception()?;

    let payload = parse_body(&body)?;
    let now = Utc::now();
    let new = parse_new_appointment(&payload, now).map_err(|errors| {
        AppointmentError::Validation(
            errors
                .first_message()
                .unwrap_or("Invalid appointment")
                .to_string(),
        )
    })?;

    let appointment = AppointmentRepository::new(state.supabase.clone())
        .create(&new, now)
        .await?;

    notifier.appointment_created(&user, &appointment);

    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(appointment_id): Path<String>,
    body: Bytes,
) -> Result<Json<Appointment>, AppError> {
    user.require_reception()?;

    let id = parse_id(&appointment_id)?;
    let payload = parse_body(&body)?;
    let changes = parse_appointment_changes(&payload).map_err(AppointmentError::InvalidFields)?;

    let appointment = AppointmentRepository::new(state.supabase.clone())
        .update(id, &changes, Utc::now())
        .await?;

    Ok(Json(appointment))
}
