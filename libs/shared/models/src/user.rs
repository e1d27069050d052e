use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;

/// Row of the `users` table as PostgREST returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub microsoft_access_token: Option<String>,
    #[serde(default)]
    pub microsoft_refresh_token: Option<String>,
    #[serde(default)]
    pub microsoft_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `id, name, email` projection used wherever a doctor is shown next to an appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Lower-cased, trimmed form under which emails are stored and looked up.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_row_deserializes_without_optional_columns() {
        let id = Uuid::new_v4();
        let row: UserRecord = serde_json::from_value(json!({
            "id": id,
            "email": "doc@example.com",
            "name": "Dr. Who",
            "role": "doctor"
        }))
        .unwrap();

        assert_eq!(row.id, id);
        assert_eq!(row.role, Role::Doctor);
        assert_eq!(row.password, None);
        assert_eq!(row.microsoft_refresh_token, None);
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Doc@Example.COM "), "doc@example.com");
    }
}
