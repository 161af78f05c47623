//! Login: verify the password, issue a session, set the cookie.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::{debug, error, info};

use super::{session_cookie, Credentials};
use crate::auth::password;
use crate::auth::session::SessionManager;
use crate::http::SessionSettings;
use crate::users;

#[utoipa::path(
    post,
    path = "/login",
    request_body = Credentials,
    responses(
        (status = 204, description = "Login successful, session cookie set"),
        (status = 401, description = "Incorrect username or password", body = String),
        (status = 400, description = "Missing payload", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    sessions: Extension<Arc<SessionManager>>,
    settings: Extension<Arc<SessionSettings>>,
    payload: Option<Json<Credentials>>,
) -> impl IntoResponse {
    let Some(Json(credentials)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let username = credentials.username.trim().to_string();
    let password = SecretString::from(credentials.password);
    if username.is_empty() || password.expose_secret().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing username or password".to_string(),
        )
            .into_response();
    }

    // Unknown user and wrong password answer identically.
    let record = match users::lookup_password_params(&pool, &username).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!(username = %username, "login for unknown username");
            return incorrect_credentials();
        }
        Err(err) => {
            error!("Failed to look up user: {err}");
            return login_failed();
        }
    };

    // Verification re-derives the key with the record's own parameters;
    // keep the KDF off the async workers.
    let matched = tokio::task::spawn_blocking(move || {
        password::verify(password.expose_secret().as_bytes(), &record)
    })
    .await;

    let matched = match matched {
        Ok(Ok(matched)) => matched,
        Ok(Err(err)) => {
            // Malformed stored record: server-side data problem, not a
            // bad password.
            error!("Stored credential record is unusable: {err}");
            return login_failed();
        }
        Err(err) => {
            error!("Verification task failed: {err}");
            return login_failed();
        }
    };

    if !matched {
        debug!(username = %username, "password mismatch");
        return incorrect_credentials();
    }

    let token = match sessions.issue(&username, settings.session_ttl).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session: {err}");
            return login_failed();
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(&token, settings.session_ttl) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return login_failed();
        }
    }

    info!(username = %username, "user logged in");
    (StatusCode::NO_CONTENT, headers).into_response()
}

fn incorrect_credentials() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        "Incorrect username or password".to_string(),
    )
        .into_response()
}

fn login_failed() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Login failed".to_string(),
    )
        .into_response()
}
