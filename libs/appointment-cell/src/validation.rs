// =====================================================================================
// APPOINTMENT PAYLOAD VALIDATION
// =====================================================================================
//
// Turns an untyped JSON body into a `NewAppointment` or `AppointmentChanges`.
// Every failed check is recorded against its camelCase field name, in field order.
//
// =====================================================================================

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use security_cell::ValidationService;
use shared_models::error::FieldErrors;

use crate::models::{
    AppointmentChanges, AppointmentStatus, NewAppointment, DEFAULT_DURATION_MINUTES,
    MAX_DURATION_MINUTES, MIN_DURATION_MINUTES, PAST_DATE_MESSAGE,
};

const PATIENT_NAME_REQUIRED: &str = "Patient name is required";
const ADDED_BY_REQUIRED: &str = "Added by is required";
const EXAM_TYPE_REQUIRED: &str = "Exam type is required";
const INVALID_EMAIL: &str = "Invalid email";
const INVALID_DATE: &str = "Invalid date and time";
const INVALID_DURATION: &str = "Duration must be a whole number between 5 and 480 minutes";
const INVALID_LINK: &str = "URL must be https or http";
const INVALID_DOCTOR: &str = "Invalid doctor id";
const INVALID_STATUS: &str = "Status must be scheduled, completed or cancelled";
const MUST_BE_TEXT: &str = "Must be text";

pub fn parse_new_appointment(
    body: &Value,
    now: DateTime<Utc>,
) -> Result<NewAppointment, FieldErrors> {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or(&empty);
    let mut errors = FieldErrors::new();

    let patient_name = required_text(fields, "patientName", PATIENT_NAME_REQUIRED, &mut errors);
    let added_by = required_text(fields, "addedBy", ADDED_BY_REQUIRED, &mut errors);
    let patient_phone = record(&mut errors, "patientPhone", optional_text(fields, "patientPhone"));
    let patient_email = record(&mut errors, "patientEmail", optional_email(fields));

    let appointment_date = match fields.get("appointmentDate") {
        Some(Value::String(raw)) => match parse_timestamp(raw) {
            Some(date) if date < now => {
                errors.add("appointmentDate", PAST_DATE_MESSAGE);
                None
            }
            Some(date) => Some(date),
            None => {
                errors.add("appointmentDate", INVALID_DATE);
                None
            }
        },
        _ => {
            errors.add("appointmentDate", INVALID_DATE);
            None
        }
    };

    let duration_minutes = match fields.get("durationMinutes") {
        None | Some(Value::Null) => Some(DEFAULT_DURATION_MINUTES),
        Some(value) => record(&mut errors, "durationMinutes", parse_duration(value)),
    };

    let exam_type = required_text(fields, "examType", EXAM_TYPE_REQUIRED, &mut errors);
    let one_drive_link = record(&mut errors, "oneDriveLink", optional_link(fields));
    let internal_notes = record(&mut errors, "internalNotes", optional_text(fields, "internalNotes"));
    let assigned_doctor_id = record(&mut errors, "assignedDoctorId", optional_doctor(fields));

    match (
        patient_name,
        added_by,
        patient_phone,
        patient_email,
        appointment_date,
        duration_minutes,
        exam_type,
        one_drive_link,
        internal_notes,
        assigned_doctor_id,
    ) {
        (
            Some(patient_name),
            Some(added_by),
            Some(patient_phone),
            Some(patient_email),
            Some(appointment_date),
            Some(duration_minutes),
            Some(exam_type),
            Some(one_drive_link),
            Some(internal_notes),
            Some(assigned_doctor_id),
        ) if errors.is_empty() => Ok(NewAppointment {
            patient_name,
            added_by,
            patient_phone,
            patient_email,
            appointment_date,
            duration_minutes,
            exam_type,
            one_drive_link,
            internal_notes,
            assigned_doctor_id,
        }),
        _ => Err(errors),
    }
}

/// Only present keys are checked. The past-date rule for updates is enforced by the repository.
pub fn parse_appointment_changes(body: &Value) -> Result<AppointmentChanges, FieldErrors> {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or(&empty);
    let mut errors = FieldErrors::new();
    let mut changes = AppointmentChanges::default();

    if present(fields, "patientName") {
        changes.patient_name =
            required_text(fields, "patientName", PATIENT_NAME_REQUIRED, &mut errors);
    }
    if present(fields, "addedBy") {
        changes.added_by = required_text(fields, "addedBy", ADDED_BY_REQUIRED, &mut errors);
    }
    if fields.contains_key("patientPhone") {
        changes.patient_phone =
            record(&mut errors, "patientPhone", optional_text(fields, "patientPhone"));
    }
    if fields.contains_key("patientEmail") {
        changes.patient_email = record(&mut errors, "patientEmail", optional_email(fields));
    }
    if present(fields, "appointmentDate") {
        changes.appointment_date = match fields.get("appointmentDate") {
            Some(Value::String(raw)) => parse_timestamp(raw),
            _ => None,
        };
        if changes.appointment_date.is_none() {
            errors.add("appointmentDate", INVALID_DATE);
        }
    }
    if let Some(value) = fields.get("durationMinutes").filter(|v| !v.is_null()) {
        changes.duration_minutes = record(&mut errors, "durationMinutes", parse_duration(value));
    }
    if present(fields, "examType") {
        changes.exam_type = required_text(fields, "examType", EXAM_TYPE_REQUIRED, &mut errors);
    }
    if let Some(value) = fields.get("status").filter(|v| !v.is_null()) {
        changes.status = value
            .as_str()
            .and_then(|s| s.parse::<AppointmentStatus>().ok());
        if changes.status.is_none() {
            errors.add("status", INVALID_STATUS);
        }
    }
    if fields.contains_key("oneDriveLink") {
        changes.one_drive_link = record(&mut errors, "oneDriveLink", optional_link(fields));
    }
    if fields.contains_key("internalNotes") {
        changes.internal_notes =
            record(&mut errors, "internalNotes", optional_text(fields, "internalNotes"));
    }
    if fields.contains_key("assignedDoctorId") {
        changes.assigned_doctor_id =
            record(&mut errors, "assignedDoctorId", optional_doctor(fields));
    }

    errors.into_result().map(|_| changes)
}

// ==============================================================================
// FIELD HELPERS
// ==============================================================================

fn present(fields: &Map<String, Value>, key: &str) -> bool {
    fields.get(key).is_some_and(|v| !v.is_null())
}

fn record<T>(errors: &mut FieldErrors, field: &str, result: Result<T, &str>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

fn required_text(
    fields: &Map<String, Value>,
    key: &str,
    message: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match fields.get(key).and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => {
            errors.add(key, message);
            None
        }
    }
}

/// Absent, `null` and blank strings all normalize to `None`.
fn optional_text(fields: &Map<String, Value>, key: &str) -> Result<Option<String>, &'static str> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(MUST_BE_TEXT),
    }
}

fn optional_email(fields: &Map<String, Value>) -> Result<Option<String>, &'static str> {
    match optional_text(fields, "patientEmail") {
        Ok(Some(email)) if !ValidationService::validate_email(&email) => Err(INVALID_EMAIL),
        Err(_) => Err(INVALID_EMAIL),
        other => other,
    }
}

fn optional_link(fields: &Map<String, Value>) -> Result<Option<String>, &'static str> {
    match optional_text(fields, "oneDriveLink") {
        Ok(Some(link)) if !ValidationService::is_allowed_link(&link) => Err(INVALID_LINK),
        Err(_) => Err(INVALID_LINK),
        other => other,
    }
}

fn optional_doctor(fields: &Map<String, Value>) -> Result<Option<Uuid>, &'static str> {
    match optional_text(fields, "assignedDoctorId") {
        Ok(Some(raw)) => Uuid::parse_str(&raw).map(Some).map_err(|_| INVALID_DOCTOR),
        Ok(None) => Ok(None),
        Err(_) => Err(INVALID_DOCTOR),
    }
}

fn parse_duration(value: &Value) -> Result<i32, &'static str> {
    value
        .as_i64()
        .filter(|m| (i64::from(MIN_DURATION_MINUTES)..=i64::from(MAX_DURATION_MINUTES)).contains(m))
        .and_then(|m| i32::try_from(m).ok())
        .ok_or(INVALID_DURATION)
}

/// RFC 3339 instant; any offset is normalized to UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "patientName": "  Jane Patient ",
            "addedBy": "Front Desk",
            "appointmentDate": "2030-03-04T15:00:00Z",
            "examType": "Eye exam"
        })
    }

    #[test]
    fn minimal_body_gets_defaults() {
        let new = parse_new_appointment(&valid_body(), now()).unwrap();

        assert_eq!(new.patient_name, "Jane Patient");
        assert_eq!(new.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(new.patient_email, None);
        assert_eq!(new.assigned_doctor_id, None);
    }

    #[test]
    fn blank_optional_fields_become_none() {
        let mut body = valid_body();
        body["patientEmail"] = json!("");
        body["patientPhone"] = json!("   ");
        body["oneDriveLink"] = json!("");
        body["assignedDoctorId"] = json!("");

        let new = parse_new_appointment(&body, now()).unwrap();

        assert_eq!(new.patient_email, None);
        assert_eq!(new.patient_phone, None);
        assert_eq!(new.one_drive_link, None);
        assert_eq!(new.assigned_doctor_id, None);
    }

    #[test]
    fn missing_required_fields_are_reported_in_order() {
        let errors = parse_new_appointment(&json!({}), now()).unwrap_err();

        assert_eq!(errors.first_message(), Some(PATIENT_NAME_REQUIRED));
        assert!(errors.contains("addedBy"));
        assert!(errors.contains("appointmentDate"));
        assert!(errors.contains("examType"));
        assert!(!errors.contains("durationMinutes"));
    }

    #[test]
    fn non_object_body_is_treated_as_empty() {
        let errors = parse_new_appointment(&json!([1, 2, 3]), now()).unwrap_err();
        assert!(errors.contains("patientName"));
    }

    #[test]
    fn duration_bounds() {
        for (value, ok) in [
            (json!(5), true),
            (json!(480), true),
            (json!(4), false),
            (json!(481), false),
            (json!(30.5), false),
            (json!("30"), false),
        ] {
            let mut body = valid_body();
            body["durationMinutes"] = value.clone();
            assert_eq!(
                parse_new_appointment(&body, now()).is_ok(),
                ok,
                "duration {}",
                value
            );
        }
    }

    #[test]
    fn rejects_script_links_and_bad_emails() {
        let mut body = valid_body();
        body["oneDriveLink"] = json!("javascript:alert(1)");
        body["patientEmail"] = json!("not-an-email");

        let errors = parse_new_appointment(&body, now()).unwrap_err();

        assert_eq!(errors.messages_for("oneDriveLink"), vec![INVALID_LINK]);
        assert_eq!(errors.messages_for("patientEmail"), vec![INVALID_EMAIL]);
        assert_eq!(errors.first_message(), Some(INVALID_EMAIL));
    }

    #[test]
    fn past_dates_are_rejected_on_create() {
        let mut body = valid_body();
        body["appointmentDate"] = json!((now() - Duration::minutes(1)).to_rfc3339());

        let errors = parse_new_appointment(&body, now()).unwrap_err();
        assert_eq!(errors.first_message(), Some(PAST_DATE_MESSAGE));
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let mut body = valid_body();
        body["appointmentDate"] = json!("2030-03-04T10:00:00-05:00");

        let new = parse_new_appointment(&body, now()).unwrap();
        assert_eq!(
            new.appointment_date,
            Utc.with_ymd_and_hms(2030, 3, 4, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn doctor_id_must_be_a_uuid() {
        let mut body = valid_body();
        body["assignedDoctorId"] = json!("doctor-1");

        let errors = parse_new_appointment(&body, now()).unwrap_err();
        assert_eq!(errors.messages_for("assignedDoctorId"), vec![INVALID_DOCTOR]);
    }

    #[test]
    fn changes_distinguish_absent_from_cleared() {
        let changes = parse_appointment_changes(&json!({
            "patientEmail": "",
            "internalNotes": null,
            "status": "cancelled"
        }))
        .unwrap();

        assert_eq!(changes.patient_email, Some(None));
        assert_eq!(changes.internal_notes, Some(None));
        assert_eq!(changes.patient_phone, None);
        assert_eq!(changes.status, Some(AppointmentStatus::Cancelled));
    }

    #[test]
    fn changes_report_every_invalid_field() {
        let errors = parse_appointment_changes(&json!({
            "status": "archived",
            "durationMinutes": 1000,
            "patientName": "   "
        }))
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert!(errors.contains("status"));
        assert!(errors.contains("durationMinutes"));
        assert!(errors.contains("patientName"));
    }

    #[test]
    fn changes_accept_any_parseable_date() {
        let changes = parse_appointment_changes(&json!({
            "appointmentDate": "2001-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(changes.appointment_date.is_some());
    }
}
