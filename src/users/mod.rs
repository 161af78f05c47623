//! User rows: username plus the encoded credential record.

use sqlx::error::ErrorKind;
use sqlx::{PgPool, Row};
use tracing::Instrument;

const INSERT_USER: &str = r"
    INSERT INTO User_ (username, password_params)
    VALUES ($1, $2)
";

const SELECT_PASSWORD_PARAMS: &str = r"
    SELECT password_params
    FROM User_
    WHERE username = $1
";

/// Outcome of attempting to create a user.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertUserOutcome {
    Created,
    /// The username is already taken.
    Conflict,
}

/// Insert a new user with their encoded credential record.
///
/// A duplicate username is reported as [`InsertUserOutcome::Conflict`],
/// classified through the driver's structured error kind rather than a
/// SQLSTATE string.
///
/// # Errors
///
/// Any store failure other than a unique violation.
pub async fn insert_user(
    pool: &PgPool,
    username: &str,
    password_params: &str,
) -> Result<InsertUserOutcome, sqlx::Error> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = INSERT_USER
    );
    let result = sqlx::query(INSERT_USER)
        .bind(username)
        .bind(password_params)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(InsertUserOutcome::Created),
        Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::Conflict),
        Err(err) => Err(err),
    }
}

/// Fetch the stored credential record for `username`, if the user exists.
///
/// # Errors
///
/// Store failures only; an unknown username is `Ok(None)`.
pub async fn lookup_password_params(
    pool: &PgPool,
    username: &str,
) -> Result<Option<String>, sqlx::Error> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = SELECT_PASSWORD_PARAMS
    );
    let row = sqlx::query(SELECT_PASSWORD_PARAMS)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.map(|row| row.get("password_params")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => matches!(db_err.kind(), ErrorKind::UniqueViolation),
        _ => false,
    }
}
