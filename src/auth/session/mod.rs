//! Session issuance, resolution, and revocation.
//!
//! The manager owns the digest-to-username mapping. Exactly one backing
//! store is active per deployment:
//!
//! - [`postgres::PgSessionStore`] (durable): one session per username,
//!   replaced atomically on each login, removed only by logout.
//! - [`memory::MemorySessionStore`] (volatile): unlimited concurrent
//!   sessions per username, each with its own optional TTL.
//!
//! A presented token that is absent, expired, revoked, or superseded
//! resolves to `None`; callers cannot distinguish the cases. Backing-store
//! faults are surfaced as errors, never collapsed into "no session".

use std::time::Duration;

use thiserror::Error;

use super::primitives::RandomSourceError;
use super::token::{self, SESSION_TOKEN_LEN_BYTES};

pub mod memory;
pub mod postgres;

use memory::MemorySessionStore;
use postgres::PgSessionStore;

/// Which backing store a deployment runs its sessions on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStorePolicy {
    Durable,
    Volatile,
}

impl std::str::FromStr for SessionStorePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "durable" => Ok(Self::Durable),
            "volatile" => Ok(Self::Volatile),
            other => Err(format!("unknown session store policy: {other}")),
        }
    }
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Entropy source failed during token generation; fatal to the
    /// current request, never silently downgraded.
    #[error(transparent)]
    RandomSource(#[from] RandomSourceError),
    /// The backing store failed. Surfaced so infrastructure faults are
    /// not mistaken for unauthenticated requests.
    #[error("session store failure: {0}")]
    Store(#[from] sqlx::Error),
}

enum Store {
    Durable(PgSessionStore),
    Volatile(MemorySessionStore),
}

/// Issues, resolves, and revokes session tokens against the active store.
///
/// Lives from process start to shutdown and is shared by reference across
/// request handlers; no ambient global state.
pub struct SessionManager {
    store: Store,
}

impl SessionManager {
    /// Durable policy backed by the `SessionId` table.
    #[must_use]
    pub fn durable(pool: sqlx::PgPool) -> Self {
        Self {
            store: Store::Durable(PgSessionStore::new(pool)),
        }
    }

    /// Volatile in-process policy. Requires a tokio runtime for TTL
    /// reapers.
    #[must_use]
    pub fn volatile() -> Self {
        Self {
            store: Store::Volatile(MemorySessionStore::new()),
        }
    }

    /// Issue a fresh session for `username` and return the raw token.
    ///
    /// This is the only point where a raw token is observable outside the
    /// client. Under the durable policy a repeat issue for the same user
    /// replaces the previous session, and `ttl` is ignored (durable
    /// sessions end at logout); under the volatile policy each issue adds
    /// an independent session removed after `ttl`, if given.
    ///
    /// # Errors
    ///
    /// [`SessionError::RandomSource`] if secure randomness is unavailable,
    /// [`SessionError::Store`] on a backing-store fault.
    pub async fn issue(
        &self,
        username: &str,
        ttl: Option<Duration>,
    ) -> Result<String, SessionError> {
        let raw = token::generate_session_token(SESSION_TOKEN_LEN_BYTES)?;
        let digest = token::digest_token(&raw);

        match &self.store {
            Store::Durable(store) => store.upsert(username, &digest).await?,
            Store::Volatile(store) => store.insert(username, digest, ttl).await,
        }

        Ok(raw)
    }

    /// Resolve a presented token to its username.
    ///
    /// `Ok(None)` covers never-issued, expired, revoked, and superseded
    /// tokens alike.
    ///
    /// # Errors
    ///
    /// [`SessionError::Store`] on a backing-store fault.
    pub async fn resolve(&self, raw_token: &str) -> Result<Option<String>, SessionError> {
        let digest = token::digest_token(raw_token);
        match &self.store {
            Store::Durable(store) => Ok(store.lookup(&digest).await?),
            Store::Volatile(store) => Ok(store.lookup(&digest).await),
        }
    }

    /// Remove the session matching `raw_token`. Idempotent.
    ///
    /// # Errors
    ///
    /// [`SessionError::Store`] on a backing-store fault.
    pub async fn revoke(&self, raw_token: &str) -> Result<(), SessionError> {
        let digest = token::digest_token(raw_token);
        match &self.store {
            Store::Durable(store) => store.delete(&digest).await?,
            Store::Volatile(store) => store.remove(&digest).await,
        }
        Ok(())
    }

    /// Remove every session belonging to `username`. Idempotent.
    ///
    /// # Errors
    ///
    /// [`SessionError::Store`] on a backing-store fault.
    pub async fn revoke_user(&self, username: &str) -> Result<(), SessionError> {
        match &self.store {
            Store::Durable(store) => store.delete_for_user(username).await?,
            Store::Volatile(store) => store.remove_for_user(username).await,
        }
        Ok(())
    }
}
