use crate::{
    api::{self, AppState, auth::RemoteAuthenticator},
    cli::commands::{auth, cloudant},
    cloudant::{Cloudant, Endpoint},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub cloudant: cloudant::Options,
    pub auth: auth::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the Cloudant URL is invalid, the registry database
/// cannot be created, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let endpoint = Endpoint::parse(&args.cloudant.url).context("invalid Cloudant URL")?;
    let cloudant = Cloudant::new(endpoint, args.cloudant.username, args.cloudant.password)?;

    cloudant
        .create_database(&args.cloudant.registry)
        .await
        .context("Could not create the registry database")?;

    let authenticator =
        RemoteAuthenticator::new(args.auth.url).context("Could not build identity client")?;

    let state = Arc::new(AppState {
        cloudant,
        authenticator: Arc::new(authenticator),
        registry: args.cloudant.registry,
    });

    api::new(args.port, state).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("cloudant_url", args.cloudant.url.clone()),
        ("cloudant_username", args.cloudant.username.clone()),
        ("registry_database", args.cloudant.registry.clone()),
        ("auth_url", args.auth.url.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
        assert_eq!(short_commit(" unknown "), "unknown");
    }
}
