//! End-to-end checks for the session middleware and the credential
//! round trip, using the in-memory session store so no database is
//! needed.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Extension,
    http::{header::COOKIE, Request, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower::ServiceExt;

use goalpost::auth::password::{CredentialHasher, KdfParams};
use goalpost::auth::session::SessionManager;
use goalpost::http::handlers::{authorize, CurrentUser};

fn cheap_hasher() -> CredentialHasher {
    let params = KdfParams {
        memory_kib: 8,
        time_cost: 1,
        parallelism: 1,
        ..KdfParams::default()
    };
    CredentialHasher::new(params, 16, 16)
}

async fn whoami(Extension(CurrentUser(username)): Extension<CurrentUser>) -> impl IntoResponse {
    username
}

fn protected_app(sessions: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .route_layer(middleware::from_fn(authorize))
        .layer(Extension(sessions))
}

#[tokio::test]
async fn login_and_access_protected_route() -> anyhow::Result<()> {
    let sessions = Arc::new(SessionManager::volatile());
    let token = sessions.issue("alice", None).await?;
    let app = protected_app(sessions);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(COOKIE, format!("session_id={token}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"alice");
    Ok(())
}

#[tokio::test]
async fn request_without_cookie_is_unauthorized() -> anyhow::Result<()> {
    let app = protected_app(Arc::new(SessionManager::volatile()));

    let response = app
        .oneshot(Request::builder().uri("/whoami").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn revoked_session_is_unauthorized() -> anyhow::Result<()> {
    let sessions = Arc::new(SessionManager::volatile());
    let token = sessions.issue("alice", None).await?;
    sessions.revoke(&token).await?;
    let app = protected_app(sessions);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(COOKIE, format!("session_id={token}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn expired_session_is_unauthorized() -> anyhow::Result<()> {
    let sessions = Arc::new(SessionManager::volatile());
    let token = sessions
        .issue("alice", Some(Duration::from_millis(50)))
        .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let app = protected_app(sessions);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(COOKIE, format!("session_id={token}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn credential_round_trip_survives_storage_as_text() -> anyhow::Result<()> {
    let hasher = cheap_hasher();
    let record = hasher.hash(b"correct horse battery staple")?;

    // The record is self-describing, so verification only needs the text.
    assert!(goalpost::auth::password::verify(
        b"correct horse battery staple",
        &record
    )?);
    assert!(!goalpost::auth::password::verify(b"Tr0ub4dor&3", &record)?);
    Ok(())
}
