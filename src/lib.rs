//! Goal tracking service with password logins and cookie sessions.
//!
//! Credentials are stored as self-describing Argon2id records and
//! sessions as SHA-256 digests of random bearer tokens, kept either in
//! Postgres or in process memory.

pub mod auth;
pub mod cli;
pub mod goals;
pub mod http;
pub mod users;
