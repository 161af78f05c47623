//! Authentication substrate: password hashing and session management.
//!
//! Two independent pieces:
//!
//! - [`password`] turns a plaintext password into a self-describing
//!   Argon2id record at registration and checks a plaintext against a
//!   stored record at login.
//! - [`session`] issues unguessable session tokens, stores only their
//!   SHA-256 digests, and resolves a presented token back to a username
//!   until logout, supersession, or expiry.
//!
//! Raw tokens and plaintext passwords exist in this process only
//! transiently; neither is ever written to storage or logged.

pub mod password;
pub mod primitives;
pub mod session;
pub mod token;
