use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_CLOUDANT_URL: &str = "cloudant-url";
pub const ARG_CLOUDANT_USERNAME: &str = "cloudant-username";
pub const ARG_CLOUDANT_PASSWORD: &str = "cloudant-password";
pub const ARG_REGISTRY_DATABASE: &str = "registry-database";

pub const DEFAULT_REGISTRY_DATABASE: &str = "bluelist_registry";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub username: String,
    pub password: SecretString,
    pub registry: String,
}

impl Options {
    /// Parse Cloudant arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the URL or the admin credentials are missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let url = get_non_empty(ARG_CLOUDANT_URL)
            .with_context(|| format!("missing required argument: --{ARG_CLOUDANT_URL}"))?;
        let username = get_non_empty(ARG_CLOUDANT_USERNAME)
            .with_context(|| format!("missing required argument: --{ARG_CLOUDANT_USERNAME}"))?;
        let password = get_non_empty(ARG_CLOUDANT_PASSWORD)
            .with_context(|| format!("missing required argument: --{ARG_CLOUDANT_PASSWORD}"))?;
        let registry = get_non_empty(ARG_REGISTRY_DATABASE)
            .unwrap_or_else(|| DEFAULT_REGISTRY_DATABASE.to_string());

        Ok(Self {
            url,
            username,
            password: SecretString::from(password),
            registry,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLOUDANT_URL)
                .long(ARG_CLOUDANT_URL)
                .help("Cloudant account URL (http(s)://host[:port])")
                .env("BLUELIST_CLOUDANT_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_CLOUDANT_USERNAME)
                .long(ARG_CLOUDANT_USERNAME)
                .help("Cloudant admin username")
                .env("BLUELIST_CLOUDANT_USERNAME")
                .global(true),
        )
        .arg(
            Arg::new(ARG_CLOUDANT_PASSWORD)
                .long(ARG_CLOUDANT_PASSWORD)
                .help("Cloudant admin password")
                .env("BLUELIST_CLOUDANT_PASSWORD")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_REGISTRY_DATABASE)
                .long(ARG_REGISTRY_DATABASE)
                .help("Database storing the per-user API keys")
                .env("BLUELIST_REGISTRY_DATABASE")
                .default_value(DEFAULT_REGISTRY_DATABASE)
                .global(true),
        )
}
