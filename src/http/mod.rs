//! HTTP server wiring: pool, session manager, routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

use crate::auth::session::{SessionManager, SessionStorePolicy};
use crate::http::handlers::{
    goals::{__path_create, __path_list, GoalView},
    health::__path_health,
    login::__path_login,
    logout::__path_logout,
    register::__path_register,
    Credentials,
};

pub mod handlers;

/// Session knobs shared with the handlers.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Lifetime for volatile sessions. Durable sessions live until
    /// logout or supersession and ignore this.
    pub session_ttl: Option<Duration>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, register, login, logout, create, list),
    components(
        schemas(Credentials, crate::goals::NewGoal, GoalView)
    ),
    tags(
        (name = "auth", description = "Registration and session endpoints"),
        (name = "goals", description = "Goal tracking API"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Start the server.
/// # Errors
/// Returns an error if the database is unreachable or the listener
/// cannot bind.
pub async fn new(
    port: u16,
    dsn: String,
    policy: SessionStorePolicy,
    session_ttl: Option<Duration>,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let sessions = Arc::new(match policy {
        SessionStorePolicy::Durable => SessionManager::durable(pool.clone()),
        SessionStorePolicy::Volatile => SessionManager::volatile(),
    });
    let settings = Arc::new(SessionSettings { session_ttl });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    // Routes behind the session cookie.
    let protected = Router::new()
        .route(
            "/goals",
            get(handlers::goals::list).post(handlers::goals::create),
        )
        .route("/logout", post(handlers::logout::logout))
        .route_layer(middleware::from_fn(handlers::authorize));

    let app = Router::new()
        .merge(protected)
        .route("/register", post(handlers::register::register))
        .route("/login", post(handlers::login::login))
        .route("/health", get(handlers::health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(pool))
                .layer(Extension(sessions))
                .layer(Extension(settings)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
