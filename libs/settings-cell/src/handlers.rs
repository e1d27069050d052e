use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use notification_cell::OutlookCalendarClient;
use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{ChangePasswordRequest, OutlookStatus};
use crate::services::AccountPasswordService;

pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;
    let request: ChangePasswordRequest = serde_json::from_value(value)
        .map_err(|_| AppError::ValidationError("Validation failed".to_string()))?;

    let change = request.validate()?;
    AccountPasswordService::new(state.supabase.clone())
        .change_password(user.id, &change)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn outlook_status(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<OutlookStatus>, AppError> {
    let outlook = OutlookCalendarClient::new(&state.config, state.supabase.clone());

    Ok(Json(OutlookStatus {
        configured: outlook.is_configured(),
        connected: outlook.is_connected(user.id).await?,
    }))
}

pub async fn disconnect_outlook(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<StatusCode, AppError> {
    OutlookCalendarClient::new(&state.config, state.supabase.clone())
        .disconnect(user.id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
