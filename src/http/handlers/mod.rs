//! Request handlers and the session-cookie authorization middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::session::SessionManager;

pub mod goals;
pub mod health;
pub mod login;
pub mod logout;
pub mod register;

/// Cookie carrying the raw session token.
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// Username of the authenticated caller, injected by [`authorize`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

/// Login/registration request body.
#[derive(Deserialize, ToSchema)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Middleware guarding authenticated routes.
///
/// Resolves the `session_id` cookie and injects [`CurrentUser`] for
/// downstream handlers. Missing, expired, revoked, and superseded tokens
/// all answer 401 identically; a store fault answers 500 so an
/// infrastructure failure is never logged as a failed authentication.
pub async fn authorize(
    Extension(sessions): Extension<Arc<SessionManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_session_token(request.headers()) else {
        return please_log_in();
    };

    match sessions.resolve(&token).await {
        Ok(Some(username)) => {
            request.extensions_mut().insert(CurrentUser(username));
            next.run(request).await
        }
        Ok(None) => please_log_in(),
        Err(err) => {
            error!("Failed to resolve session: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session lookup failed".to_string(),
            )
                .into_response()
        }
    }
}

fn please_log_in() -> Response {
    (StatusCode::UNAUTHORIZED, "Please log in".to_string()).into_response()
}

/// Pull the raw session token out of the request's cookies.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

/// Build the `HttpOnly` session cookie for a freshly issued token.
pub(crate) fn session_cookie(
    token: &str,
    ttl: Option<Duration>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(ttl) = ttl {
        cookie.push_str(&format!("; Max-Age={}", ttl.as_secs()));
    }
    HeaderValue::from_str(&cookie)
}

/// Cookie that clears the session on the client.
pub(crate) fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session_id=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_session_token_finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc123; lang=en"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_session_token_none_when_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_is_http_only_and_carries_max_age_with_ttl() {
        let cookie = session_cookie("tok", Some(Duration::from_secs(3600))).expect("cookie");
        let value = cookie.to_str().expect("ascii");
        assert!(value.starts_with("session_id=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=3600"));
    }

    #[test]
    fn session_cookie_without_ttl_has_no_max_age() {
        let cookie = session_cookie("tok", None).expect("cookie");
        assert!(!cookie.to_str().expect("ascii").contains("Max-Age"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let value = clear_session_cookie();
        assert!(value.to_str().expect("ascii").contains("Max-Age=0"));
    }
}
