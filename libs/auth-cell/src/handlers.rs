use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use notification_cell::{NotificationError, OutlookCalendarClient};
use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use shared_models::user::normalize_email;
use shared_utils::extractor::{optional_session, SESSION_COOKIE};
use shared_utils::jwt::issue_session_token;
use shared_utils::AppState;

use crate::models::{OAuthCallbackParams, SignInRequest};
use crate::services::oauth::{
    generate_state, settings_redirect, sign_in_redirect, OAUTH_STATE_COOKIE,
    OAUTH_STATE_MAX_AGE_SECONDS,
};
use crate::services::CredentialService;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn http_only_cookie(
    name: &'static str,
    value: String,
    max_age_seconds: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_seconds))
        .secure(secure)
        .into()
}

fn cleared_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").into()
}

// ==============================================================================
// CREDENTIAL SESSIONS
// ==============================================================================

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let request: SignInRequest = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;

    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    if !state.sign_in_limiter.check(&email).await.allowed {
        return Err(AppError::TooManyRequests(
            "Too many sign-in attempts. Try again later.".to_string(),
        ));
    }

    let user = CredentialService::new(state.supabase.clone())
        .authenticate(&email, &request.password)
        .await?
        .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

    let session = SessionUser {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
    };

    let token = issue_session_token(
        &session,
        &state.config.session_secret,
        state.config.session_ttl_seconds,
    )
    .map_err(AppError::Internal)?;

    let cookie = http_only_cookie(
        SESSION_COOKIE,
        token,
        state.config.session_ttl_seconds,
        state.config.secure_cookies,
    );

    info!("User {} signed in", session.id);
    Ok((jar.add(cookie), Json(json!({ "user": session }))))
}

pub async fn sign_out(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.remove(cleared_cookie(SESSION_COOKIE)), StatusCode::NO_CONTENT)
}

pub async fn session(Extension(user): Extension<SessionUser>) -> Json<Value> {
    Json(json!({ "user": user }))
}

// ==============================================================================
// MICROSOFT CALENDAR AUTHORIZATION
// ==============================================================================

pub async fn microsoft_authorize(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Redirect), AppError> {
    let config = &state.config;

    if optional_session(config, &jar, &headers).is_none() {
        return Ok((jar, Redirect::to(&sign_in_redirect(&config.app_url))));
    }

    let outlook = OutlookCalendarClient::new(config, state.supabase.clone());
    if !outlook.is_configured() {
        return Ok((
            jar,
            Redirect::to(&settings_redirect(&config.app_url, Err("not_configured"))),
        ));
    }

    let oauth_state = generate_state();
    let authorize_url = outlook.authorize_url(&oauth_state)?;
    let cookie = http_only_cookie(
        OAUTH_STATE_COOKIE,
        oauth_state,
        OAUTH_STATE_MAX_AGE_SECONDS,
        config.secure_cookies,
    );

    debug!("Starting Microsoft authorization");
    Ok((jar.add(cookie), Redirect::to(&authorize_url)))
}

pub async fn microsoft_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<OAuthCallbackParams>,
) -> (CookieJar, Redirect) {
    let config = &state.config;

    let Some(user) = optional_session(config, &jar, &headers) else {
        return (jar, Redirect::to(&sign_in_redirect(&config.app_url)));
    };

    let saved_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(cleared_cookie(OAUTH_STATE_COOKIE));

    let outcome = connect_calendar(&state, &user, params, saved_state).await;
    if let Err(reason) = &outcome {
        warn!("Outlook connect failed for user {}: {}", user.id, reason);
    }

    let target = settings_redirect(
        &config.app_url,
        outcome.as_ref().map(|_| ()).map_err(String::as_str),
    );
    (jar, Redirect::to(&target))
}

/// Completes the code exchange. `Err` carries the `message` reported to the settings page.
async fn connect_calendar(
    state: &AppState,
    user: &SessionUser,
    params: OAuthCallbackParams,
    saved_state: Option<String>,
) -> Result<(), String> {
    if let Some(error) = params.error {
        return Err(error);
    }

    let code = match (params.code, params.state, saved_state) {
        (Some(code), Some(returned), Some(saved)) if returned == saved => code,
        _ => return Err("invalid_callback".to_string()),
    };

    let outlook = OutlookCalendarClient::new(&state.config, state.supabase.clone());
    if !outlook.is_configured() {
        return Err("not_configured".to_string());
    }

    let grant = outlook.exchange_code(&code).await.map_err(|e| match e {
        NotificationError::MissingTokens => "no_tokens".to_string(),
        _ => "token_exchange_failed".to_string(),
    })?;

    outlook
        .store_grant(user.id, &grant)
        .await
        .map_err(|_| "token_exchange_failed".to_string())
}
