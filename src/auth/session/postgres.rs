//! Durable session store backed by the `SessionId` table.
//!
//! One row per username. The upsert is a single statement, so two
//! concurrent logins for the same user cannot lose an update; the row
//! that commits last wins and the other token is superseded. Concurrency
//! control is delegated to Postgres row locking, no in-process lock.

use sqlx::{PgPool, Row};
use tracing::Instrument;

use crate::auth::token::TokenDigest;

const UPSERT_SESSION: &str = r"
    INSERT INTO SessionId (username, session_id_sha256)
    VALUES ($1, $2)
    ON CONFLICT (username) DO UPDATE
    SET session_id_sha256 = EXCLUDED.session_id_sha256,
        created_at = NOW()
";

const SELECT_SESSION: &str = r"
    SELECT username
    FROM SessionId
    WHERE session_id_sha256 = $1
";

const DELETE_SESSION: &str = r"
    DELETE FROM SessionId
    WHERE session_id_sha256 = $1
";

const DELETE_USER_SESSION: &str = r"
    DELETE FROM SessionId
    WHERE username = $1
";

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the session row for `username` with a new digest. The
    /// previous token, if any, becomes unresolvable immediately.
    pub(super) async fn upsert(
        &self,
        username: &str,
        digest: &TokenDigest,
    ) -> Result<(), sqlx::Error> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = UPSERT_SESSION
        );
        sqlx::query(UPSERT_SESSION)
            .bind(username)
            .bind(&digest.as_bytes()[..])
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    pub(super) async fn lookup(&self, digest: &TokenDigest) -> Result<Option<String>, sqlx::Error> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = SELECT_SESSION
        );
        let row = sqlx::query(SELECT_SESSION)
            .bind(&digest.as_bytes()[..])
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        Ok(row.map(|row| row.get("username")))
    }

    pub(super) async fn delete(&self, digest: &TokenDigest) -> Result<(), sqlx::Error> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = DELETE_SESSION
        );
        sqlx::query(DELETE_SESSION)
            .bind(&digest.as_bytes()[..])
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    pub(super) async fn delete_for_user(&self, username: &str) -> Result<(), sqlx::Error> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = DELETE_USER_SESSION
        );
        sqlx::query(DELETE_USER_SESSION)
            .bind(username)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Normalize SQL so shape checks are not formatting-sensitive.
    fn canonical(sql: &str) -> String {
        sql.chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| ch.to_ascii_lowercase())
            .collect()
    }

    #[test]
    fn upsert_is_a_single_statement_keyed_by_username() {
        let sql = canonical(UPSERT_SESSION);
        assert!(sql.contains("onconflict(username)doupdate"));
        assert!(sql.contains("setsession_id_sha256=excluded.session_id_sha256"));
    }

    #[test]
    fn lookup_is_keyed_by_digest_only() {
        let sql = canonical(SELECT_SESSION);
        assert!(sql.contains("wheresession_id_sha256=$1"));
        assert!(!sql.contains("username=$"));
    }

    #[test]
    fn deletes_cover_token_and_username_revocation() {
        assert!(canonical(DELETE_SESSION).contains("wheresession_id_sha256=$1"));
        assert!(canonical(DELETE_USER_SESSION).contains("whereusername=$1"));
    }
}
