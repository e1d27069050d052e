use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use shared_models::user::DoctorSummary;
use shared_utils::AppState;

use crate::models::{CreateDoctorRequest, DoctorError, UpdateDoctorRequest};
use crate::services::DoctorService;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;
    serde_json::from_value(value).map_err(|_| AppError::ValidationError("Validation failed".to_string()))
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| DoctorError::NotFound.into())
}

pub async fn list_doctors(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<DoctorSummary>>, AppError> {
    user.require_reception()?;

    let doctors = DoctorService::new(state.supabase.clone()).list_doctors().await?;
    Ok(Json(doctors))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    body: Bytes,
) -> Result<(StatusCode, Json<DoctorSummary>), AppError> {
    user.require_reception()?;

    let doctor = parse_body::<CreateDoctorRequest>(&body)?.validate()?;
    let created = DoctorService::new(state.supabase.clone())
        .create_doctor(&doctor)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_doctor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(doctor_id): Path<String>,
    body: Bytes,
) -> Result<Json<DoctorSummary>, AppError> {
    user.require_reception()?;

    let id = parse_id(&doctor_id)?;
    let changes = parse_body::<UpdateDoctorRequest>(&body)?.validate()?;
    let updated = DoctorService::new(state.supabase.clone())
        .update_doctor(id, &changes)
        .await?;

    Ok(Json(updated))
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(doctor_id): Path<String>,
) -> Result<StatusCode, AppError> {
    user.require_reception()?;

    let id = parse_id(&doctor_id)?;
    DoctorService::new(state.supabase.clone())
        .delete_doctor(id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
