//! Map parsed arguments to the action to run.

use crate::cli::actions::{Action, database_name, deprovision, server};
use crate::cli::commands::{
    ARG_PORT, ARG_USERNAME, CMD_DATABASE_NAME, CMD_DEPROVISION, auth, cloudant,
};
use anyhow::{Context, Result, bail};
use clap::ArgMatches;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_DEPROVISION, sub)) => Ok(Action::Deprovision(deprovision::Args {
            username: username(sub)?,
            cloudant: cloudant::Options::parse(sub)?,
        })),
        Some((CMD_DATABASE_NAME, sub)) => Ok(Action::DatabaseName(database_name::Args {
            username: username(sub)?,
        })),
        Some((other, _)) => bail!("unknown command: {other}"),
        None => {
            let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

            Ok(Action::Server(server::Args {
                port,
                cloudant: cloudant::Options::parse(matches)?,
                auth: auth::Options::parse(matches)?,
            }))
        }
    }
}

fn username(matches: &ArgMatches) -> Result<String> {
    matches
        .get_one::<String>(ARG_USERNAME)
        .cloned()
        .context("missing required argument: <username>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    const UNSET: [(&str, Option<&str>); 6] = [
        ("BLUELIST_CLOUDANT_URL", None),
        ("BLUELIST_CLOUDANT_USERNAME", None),
        ("BLUELIST_CLOUDANT_PASSWORD", None),
        ("BLUELIST_REGISTRY_DATABASE", None),
        ("BLUELIST_AUTH_URL", None),
        ("BLUELIST_PORT", None),
    ];

    #[test]
    fn server_requires_auth_url() {
        temp_env::with_vars(UNSET, || {
            let matches = commands::new().get_matches_from(vec![
                "bluelist",
                "--cloudant-url",
                "http://localhost:5984",
                "--cloudant-username",
                "admin",
                "--cloudant-password",
                "secret",
            ]);
            let err = handler(&matches).unwrap_err();
            assert!(err.to_string().contains("--auth-url"));
        });
    }

    #[test]
    fn server_action() {
        temp_env::with_vars(UNSET, || {
            let matches = commands::new().get_matches_from(vec![
                "bluelist",
                "-p",
                "9000",
                "--cloudant-url",
                "http://localhost:5984",
                "--cloudant-username",
                "admin",
                "--cloudant-password",
                "secret",
                "--auth-url",
                "http://localhost:9999/me",
            ]);
            let Ok(Action::Server(args)) = handler(&matches) else {
                panic!("expected server action");
            };
            assert_eq!(args.port, 9000);
            assert_eq!(args.cloudant.password.expose_secret(), "secret");
            assert_eq!(args.cloudant.registry, "bluelist_registry");
            assert_eq!(args.auth.url.as_str(), "http://localhost:9999/me");
        });
    }

    #[test]
    fn deprovision_needs_cloudant_but_not_auth() {
        temp_env::with_vars(UNSET, || {
            let matches = commands::new().get_matches_from(vec![
                "bluelist",
                "deprovision",
                "alice",
                "--cloudant-url",
                "http://localhost:5984",
                "--cloudant-username",
                "admin",
                "--cloudant-password",
                "secret",
            ]);
            let Ok(Action::Deprovision(args)) = handler(&matches) else {
                panic!("expected deprovision action");
            };
            assert_eq!(args.username, "alice");

            let matches =
                commands::new().get_matches_from(vec!["bluelist", "deprovision", "alice"]);
            let err = handler(&matches).unwrap_err();
            assert!(err.to_string().contains("--cloudant-url"));
        });
    }

    #[test]
    fn database_name_needs_nothing_else() {
        temp_env::with_vars(UNSET, || {
            let matches =
                commands::new().get_matches_from(vec!["bluelist", "database-name", "alice"]);
            let Ok(Action::DatabaseName(args)) = handler(&matches) else {
                panic!("expected database-name action");
            };
            assert_eq!(args.username, "alice");
        });
    }
}
