use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// HTTP-only cookie binding the Microsoft callback to the browser that started the flow.
pub const OAUTH_STATE_COOKIE: &str = "outlook_oauth_state";
pub const OAUTH_STATE_MAX_AGE_SECONDS: i64 = 600;

const STATE_BYTES: usize = 24;

pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Settings page URL reporting the outcome of a connect attempt.
pub fn settings_redirect(app_url: &str, outcome: Result<(), &str>) -> String {
    let base = format!("{}/dashboard/settings", app_url.trim_end_matches('/'));
    match outcome {
        Ok(()) => format!("{}?outlook=connected", base),
        Err(message) => format!(
            "{}?outlook=error&message={}",
            base,
            urlencoding::encode(message)
        ),
    }
}

pub fn sign_in_redirect(app_url: &str) -> String {
    format!("{}/auth/signin", app_url.trim_end_matches('/'))
}
