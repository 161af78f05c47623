//! User registration.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::{error, info};

use super::Credentials;
use crate::auth::password::CredentialHasher;
use crate::users::{self, InsertUserOutcome};

const MIN_PASSWORD_CHARS: usize = 8;
const MAX_USERNAME_LEN: usize = 64;

#[utoipa::path(
    post,
    path = "/register",
    request_body = Credentials,
    responses(
        (status = 201, description = "Registration successful"),
        (status = 409, description = "Username already exists", body = String),
        (status = 422, description = "Validation error", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    payload: Option<Json<Credentials>>,
) -> impl IntoResponse {
    let Some(Json(credentials)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string());
    };

    let username = credentials.username.trim().to_string();
    let password = SecretString::from(credentials.password);

    if !valid_username(&username) {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Invalid username".to_string());
    }
    if password.expose_secret().chars().count() < MIN_PASSWORD_CHARS {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password must be 8 characters or longer".to_string(),
        );
    }

    // The KDF is deliberately slow; keep it off the async workers.
    let record = tokio::task::spawn_blocking(move || {
        CredentialHasher::default().hash(password.expose_secret().as_bytes())
    })
    .await;

    let record = match record {
        Ok(Ok(record)) => record,
        Ok(Err(err)) => {
            error!("Failed to hash password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating user".to_string(),
            );
        }
        Err(err) => {
            error!("Hashing task failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating user".to_string(),
            );
        }
    };

    match users::insert_user(&pool, &username, &record).await {
        Ok(InsertUserOutcome::Created) => {
            info!(username = %username, "user created");
            (StatusCode::CREATED, "OK".to_string())
        }
        Ok(InsertUserOutcome::Conflict) => (
            StatusCode::CONFLICT,
            "Username already exists".to_string(),
        ),
        Err(err) => {
            error!("Failed to insert user: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating user".to_string(),
            )
        }
    }
}

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && Regex::new(r"^[A-Za-z0-9_.-]+$").is_ok_and(|re| re.is_match(username))
}
