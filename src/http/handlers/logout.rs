//! Logout: revoke the presented session and clear the cookie.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::error;

use super::{clear_session_cookie, extract_session_token};
use crate::auth::session::SessionManager;

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = sessions.revoke(&token).await {
            error!("Failed to revoke session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_session_cookie());
    (StatusCode::NO_CONTENT, response_headers)
}
