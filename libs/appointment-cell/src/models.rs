use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::{AppError, FieldErrors};
use shared_models::user::DoctorSummary;

pub const PAST_DATE_MESSAGE: &str = "Appointment date and time cannot be in the past.";
pub const DEFAULT_DURATION_MINUTES: i32 = 60;
pub const MIN_DURATION_MINUTES: i32 = 5;
pub const MAX_DURATION_MINUTES: i32 = 480;

// ==============================================================================
// STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("Invalid status: {}", other)),
        }
    }
}

// ==============================================================================
// PERSISTENCE BOUNDARY
// ==============================================================================

/// `appointments` row exactly as PostgREST returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub patient_name: String,
    #[serde(default)]
    pub added_by: String,
    #[serde(default)]
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub patient_email: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub exam_type: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub onedrive_link: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    #[serde(default)]
    pub assigned_doctor_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Projection read by the lifecycle sweeper.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledSlot {
    pub id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
}

// ==============================================================================
// CANONICAL APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_name: String,
    pub added_by: String,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub exam_type: String,
    pub status: AppointmentStatus,
    pub one_drive_link: Option<String>,
    pub internal_notes: Option<String>,
    pub assigned_doctor_id: Option<Uuid>,
    pub assigned_doctor: Option<DoctorSummary>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// The only place a stored row becomes an `Appointment`.
    pub fn from_row(row: AppointmentRow, doctor: Option<DoctorSummary>) -> Self {
        Self {
            id: row.id,
            patient_name: row.patient_name,
            added_by: row.added_by,
            patient_phone: row.patient_phone,
            patient_email: row.patient_email,
            appointment_date: row.appointment_date,
            duration_minutes: row.duration_minutes,
            exam_type: row.exam_type,
            status: row.status,
            one_drive_link: row.onedrive_link,
            internal_notes: row.internal_notes,
            assigned_doctor_id: row.assigned_doctor_id,
            assigned_doctor: doctor,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.appointment_date + Duration::minutes(i64::from(self.duration_minutes))
    }
}

// ==============================================================================
// VALIDATED PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_name: String,
    pub added_by: String,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub exam_type: String,
    pub one_drive_link: Option<String>,
    pub internal_notes: Option<String>,
    pub assigned_doctor_id: Option<Uuid>,
}

impl NewAppointment {
    /// Insert body. Status always starts as `scheduled`.
    pub fn to_insert_row(&self) -> Value {
        serde_json::json!({
            "patient_name": self.patient_name,
            "added_by": self.added_by,
            "patient_phone": self.patient_phone,
            "patient_email": self.patient_email,
            "appointment_date": self.appointment_date,
            "duration_minutes": self.duration_minutes,
            "exam_type": self.exam_type,
            "status": AppointmentStatus::Scheduled,
            "onedrive_link": self.one_drive_link,
            "internal_notes": self.internal_notes,
            "assigned_doctor_id": self.assigned_doctor_id,
        })
    }
}

/// Partial update. For nullable columns the outer `Option` means "present", the inner one
/// the new value (`None` clears the column).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentChanges {
    pub patient_name: Option<String>,
    pub added_by: Option<String>,
    pub patient_phone: Option<Option<String>>,
    pub patient_email: Option<Option<String>>,
    pub appointment_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub exam_type: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub one_drive_link: Option<Option<String>>,
    pub internal_notes: Option<Option<String>>,
    pub assigned_doctor_id: Option<Option<Uuid>>,
}

impl AppointmentChanges {
    /// Update body holding only the columns that were present, plus `updated_at`.
    pub fn to_update_row(&self, now: DateTime<Utc>) -> Value {
        let mut row = Map::new();

        fn put<T: Serialize>(row: &mut Map<String, Value>, column: &str, value: &Option<T>) {
            if let Some(v) = value {
                row.insert(column.to_string(), serde_json::json!(v));
            }
        }

        put(&mut row, "patient_name", &self.patient_name);
        put(&mut row, "added_by", &self.added_by);
        put(&mut row, "patient_phone", &self.patient_phone);
        put(&mut row, "patient_email", &self.patient_email);
        put(&mut row, "appointment_date", &self.appointment_date);
        put(&mut row, "duration_minutes", &self.duration_minutes);
        put(&mut row, "exam_type", &self.exam_type);
        put(&mut row, "status", &self.status);
        put(&mut row, "onedrive_link", &self.one_drive_link);
        put(&mut row, "internal_notes", &self.internal_notes);
        put(&mut row, "assigned_doctor_id", &self.assigned_doctor_id);
        row.insert("updated_at".to_string(), serde_json::json!(now));

        Value::Object(row)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("{}", PAST_DATE_MESSAGE)]
    PastDate,

    #[error("{0}")]
    Validation(String),

    #[error("Validation failed")]
    InvalidFields(FieldErrors),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound => AppError::NotFound("Not found".to_string()),
            AppointmentError::Forbidden => AppError::Forbidden("Forbidden".to_string()),
            AppointmentError::PastDate => AppError::BadRequest(PAST_DATE_MESSAGE.to_string()),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::InvalidFields(fields) => AppError::InvalidFields(fields),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
