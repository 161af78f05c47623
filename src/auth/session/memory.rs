//! Volatile in-process session store.
//!
//! Unlimited concurrent sessions per username, each keyed by its token
//! digest. Resolves take a shared read lock so they never block each
//! other; inserts and removals take the write lock. A TTL'd entry gets a
//! fire-once reaper task, but the reaper is not the security boundary:
//! lookup re-checks the deadline against the current clock, so an entry
//! whose removal is still pending is already unresolvable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::auth::token::TokenDigest;

struct Entry {
    username: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

pub struct MemorySessionStore {
    table: Arc<RwLock<HashMap<TokenDigest, Entry>>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(super) async fn insert(&self, username: &str, digest: TokenDigest, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);

        {
            let mut table = self.table.write().await;
            table.insert(
                digest,
                Entry {
                    username: username.to_string(),
                    expires_at,
                },
            );
        }

        if let Some(ttl) = ttl {
            let table = Arc::clone(&self.table);
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                let mut table = table.write().await;
                // Only reap the entry if its deadline has actually passed;
                // the clock at removal time is authoritative, not the
                // timer firing.
                if table
                    .get(&digest)
                    .is_some_and(|entry| entry.expired(Instant::now()))
                {
                    table.remove(&digest);
                }
            });
        }
    }

    pub(super) async fn lookup(&self, digest: &TokenDigest) -> Option<String> {
        let table = self.table.read().await;
        let entry = table.get(digest)?;
        if entry.expired(Instant::now()) {
            return None;
        }
        Some(entry.username.clone())
    }

    pub(super) async fn remove(&self, digest: &TokenDigest) {
        self.table.write().await.remove(digest);
    }

    pub(super) async fn remove_for_user(&self, username: &str) {
        self.table
            .write()
            .await
            .retain(|_, entry| entry.username != username);
    }
}
