use std::time::Duration;

use crate::auth::session::SessionStorePolicy;
use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let policy: SessionStorePolicy = matches
        .get_one::<String>("session-store")
        .map(String::as_str)
        .unwrap_or("durable")
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let session_ttl = matches
        .get_one::<u64>("session-ttl-secs")
        .copied()
        .map(Duration::from_secs);

    Ok(Action::Server(Args {
        port,
        dsn,
        policy,
        session_ttl,
    }))
}
