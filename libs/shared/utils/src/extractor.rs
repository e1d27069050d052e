use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::SessionUser;
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

/// HTTP-only cookie carrying the session token.
pub const SESSION_COOKIE: &str = "portal_session";

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Session token from the cookie, falling back to an `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| bearer_token(headers))
}

pub fn resolve_session(
    config: &AppConfig,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<SessionUser, AppError> {
    let token = session_token(jar, headers)
        .ok_or_else(|| AppError::Auth("Unauthorized".to_string()))?;

    validate_token(&token, &config.session_secret).map_err(|e| {
        debug!("Rejected session token: {}", e);
        AppError::Auth("Unauthorized".to_string())
    })
}

/// Like [`resolve_session`] for routes that redirect instead of failing.
pub fn optional_session(config: &AppConfig, jar: &CookieJar, headers: &HeaderMap) -> Option<SessionUser> {
    resolve_session(config, jar, headers).ok()
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_session(&state.config, &jar, request.headers())?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Per-user fixed window. Must run after [`auth_middleware`].
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = extract_user(&request)?;

    let decision = state.api_limiter.check(&user.id.to_string()).await;
    if !decision.allowed {
        return Err(AppError::TooManyRequests("Too many requests".to_string()));
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(
        "x-ratelimit-remaining",
        HeaderValue::from(decision.remaining),
    );

    Ok(response)
}

pub fn extract_user<B>(request: &Request<B>) -> Result<SessionUser, AppError> {
    request
        .extensions()
        .get::<SessionUser>()
        .cloned()
        .ok_or_else(|| AppError::Auth("Unauthorized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;

    use crate::test_utils::{SessionTestUtils, TestConfig, TestUser};

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from-cookie"));

        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));
        assert_eq!(
            session_token(&CookieJar::new(), &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn missing_or_malformed_tokens_are_unauthorized() {
        let config = TestConfig::default().to_app_config();
        let mut headers = HeaderMap::new();

        assert!(resolve_session(&config, &CookieJar::new(), &headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(resolve_session(&config, &CookieJar::new(), &headers).is_err());

        let jar = CookieJar::new().add(Cookie::new(
            SESSION_COOKIE,
            SessionTestUtils::create_malformed_token(),
        ));
        assert!(optional_session(&config, &jar, &HeaderMap::new()).is_none());
    }

    #[test]
    fn valid_cookie_resolves_the_user() {
        let test_config = TestConfig::default();
        let config = test_config.to_app_config();
        let user = TestUser::doctor("doc@example.com");
        let token = SessionTestUtils::create_test_token(&user, &test_config.session_secret, None);
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, token));

        let session = resolve_session(&config, &jar, &HeaderMap::new()).unwrap();
        assert_eq!(session, user.to_session_user());
    }
}
