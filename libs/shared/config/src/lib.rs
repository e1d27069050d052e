use std::env;
use tracing::warn;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub app_url: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub session_secret: String,
    pub session_ttl_seconds: i64,
    pub secure_cookies: bool,
    pub redis_url: Option<String>,
    pub microsoft_client_id: String,
    pub microsoft_client_secret: String,
    pub microsoft_login_base_url: String,
    pub graph_base_url: String,
    pub resend_api_key: String,
    pub resend_base_url: String,
    pub email_from: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub twilio_base_url: String,
    pub practice_name: String,
}

fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn optional(name: &str) -> String {
    env::var(name).unwrap_or_default()
}

fn with_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| {
                    warn!("APP_URL not set, using default");
                    "http://localhost:3000".to_string()
                }),
            supabase_url: required("SUPABASE_URL"),
            supabase_service_key: required("SUPABASE_SERVICE_ROLE_KEY"),
            session_secret: required("AUTH_SECRET"),
            session_ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            secure_cookies: env::var("SECURE_COOKIES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            microsoft_client_id: optional("MICROSOFT_CLIENT_ID"),
            microsoft_client_secret: optional("MICROSOFT_CLIENT_SECRET"),
            microsoft_login_base_url: with_default(
                "MICROSOFT_LOGIN_BASE_URL",
                "https://login.microsoftonline.com/common/oauth2/v2.0",
            ),
            graph_base_url: with_default("GRAPH_BASE_URL", "https://graph.microsoft.com/v1.0"),
            resend_api_key: optional("RESEND_API_KEY"),
            resend_base_url: with_default("RESEND_BASE_URL", "https://api.resend.com"),
            email_from: with_default("EMAIL_FROM", "D.E.C. Portal <onboarding@resend.dev>"),
            twilio_account_sid: optional("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: optional("TWILIO_AUTH_TOKEN"),
            twilio_phone_number: optional("TWILIO_PHONE_NUMBER"),
            twilio_base_url: with_default("TWILIO_BASE_URL", "https://api.twilio.com/2010-04-01"),
            practice_name: with_default("PRACTICE_NAME", "D.E.C. Of Texas"),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if !config.is_outlook_configured() {
            warn!("Outlook calendar integration disabled (MICROSOFT_CLIENT_ID/SECRET not set)");
        }
        if !config.is_email_configured() {
            warn!("Email notifications disabled (RESEND_API_KEY not set)");
        }
        if !config.is_sms_configured() {
            warn!("SMS notifications disabled (TWILIO_* not set)");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.session_secret.is_empty()
    }

    pub fn is_outlook_configured(&self) -> bool {
        !self.microsoft_client_id.is_empty() && !self.microsoft_client_secret.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.resend_api_key.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_phone_number.is_empty()
    }

    /// Redirect target registered with Microsoft for the calendar OAuth flow.
    pub fn microsoft_redirect_uri(&self) -> String {
        format!("{}/auth/microsoft/callback", self.app_url.trim_end_matches('/'))
    }
}
