use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use url::Url;

pub const ARG_AUTH_URL: &str = "auth-url";

#[derive(Debug, Clone)]
pub struct Options {
    /// Identity endpoint that resolves an `Authorization` header to `{"id": ...}`.
    pub url: Url,
}

impl Options {
    /// # Errors
    /// Returns an error if the URL is missing or invalid.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<String>(ARG_AUTH_URL)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("missing required argument: --{ARG_AUTH_URL}"))?;

        let url = Url::parse(url).with_context(|| format!("invalid --{ARG_AUTH_URL}: {url}"))?;

        Ok(Self { url })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_AUTH_URL)
            .long(ARG_AUTH_URL)
            .help("Identity endpoint used to resolve the caller's Authorization header")
            .env("BLUELIST_AUTH_URL"),
    )
}
