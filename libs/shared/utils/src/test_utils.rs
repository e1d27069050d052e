use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, SessionClaims, SessionUser};

use crate::extractor::SESSION_COOKIE;
use crate::jwt::encode_claims;
use crate::state::AppState;

pub struct TestConfig {
    pub session_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub app_url: String,
    pub external_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            session_secret: "test-secret-key-for-session-tokens-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            app_url: "http://localhost:3000".to_string(),
            external_base_url: "http://localhost:9".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the store proxy at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    /// Points the store and every outbound provider at the same mock server.
    pub fn with_mock_server(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            external_base_url: url.to_string(),
            ..Self::default()
        }
    }

    /// Providers are left unconfigured; notification tests opt in explicitly.
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            port: 0,
            app_url: self.app_url.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            session_secret: self.session_secret.clone(),
            session_ttl_seconds: 3600,
            secure_cookies: false,
            redis_url: None,
            microsoft_client_id: String::new(),
            microsoft_client_secret: String::new(),
            microsoft_login_base_url: format!("{}/oauth2/v2.0", self.external_base_url),
            graph_base_url: format!("{}/graph/v1.0", self.external_base_url),
            resend_api_key: String::new(),
            resend_base_url: self.external_base_url.clone(),
            email_from: "Portal <portal@example.com>".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            twilio_base_url: self.external_base_url.clone(),
            practice_name: "Test Practice".to_string(),
        }
    }

    /// Same as [`to_app_config`](Self::to_app_config) with every provider credential filled in.
    pub fn to_app_config_with_providers(&self) -> AppConfig {
        AppConfig {
            microsoft_client_id: "ms-client-id".to_string(),
            microsoft_client_secret: "ms-client-secret".to_string(),
            resend_api_key: "re_test_key".to_string(),
            twilio_account_sid: "AC123".to_string(),
            twilio_auth_token: "twilio-token".to_string(),
            twilio_phone_number: "+15550000000".to_string(),
            ..self.to_app_config()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }

    pub fn to_state(&self) -> AppState {
        AppState::new(self.to_arc())
    }

    pub fn to_state_with_providers(&self) -> AppState {
        AppState::new(Arc::new(self.to_app_config_with_providers()))
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(email: &str, name: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role,
        }
    }

    pub fn reception(email: &str) -> Self {
        Self::new(email, "Front Desk", Role::Reception)
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "Dr. Test", Role::Doctor)
    }

    pub fn to_session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            email: Some(self.email.clone()),
            name: Some(self.name.clone()),
            role: self.role,
        }
    }
}

pub struct SessionTestUtils;

impl SessionTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: Some(user.email.clone()),
            name: Some(user.name.clone()),
            role: user.role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode_claims(&claims, secret).expect("test secret is non-empty")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    /// `Cookie` header value carrying a fresh session for `user`.
    pub fn session_cookie(user: &TestUser, secret: &str) -> String {
        format!("{}={}", SESSION_COOKIE, Self::create_test_token(user, secret, None))
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_row(id: Uuid, email: &str, role: Role, password_hash: Option<&str>) -> Value {
        json!({
            "id": id,
            "email": email,
            "name": "Test User",
            "password": password_hash,
            "role": role,
            "microsoft_access_token": null,
            "microsoft_refresh_token": null,
            "microsoft_token_expires_at": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(id: Uuid, name: &str, email: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "email": email
        })
    }

    pub fn appointment_row(
        id: Uuid,
        doctor_id: Option<Uuid>,
        appointment_date: DateTime<Utc>,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "patient_name": "Jane Patient",
            "added_by": "Front Desk",
            "patient_phone": "555-123-4567",
            "patient_email": "jane@example.com",
            "appointment_date": appointment_date,
            "duration_minutes": 30,
            "exam_type": "Eye exam",
            "status": status,
            "onedrive_link": null,
            "internal_notes": null,
            "assigned_doctor_id": doctor_id,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
