pub mod auth;
pub mod cloudant;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_USERNAME: &str = "username";

pub const CMD_DEPROVISION: &str = "deprovision";
pub const CMD_DATABASE_NAME: &str = "database-name";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("bluelist")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("BLUELIST_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .subcommand(
            Command::new(CMD_DEPROVISION)
                .about("Delete a user's todo database and stored credentials")
                .arg(user_arg()),
        )
        .subcommand(
            Command::new(CMD_DATABASE_NAME)
                .about("Print the database name of a user")
                .arg(user_arg()),
        );

    let command = cloudant::with_args(command);
    let command = auth::with_args(command);
    logging::with_args(command)
}

fn user_arg() -> Arg {
    Arg::new(ARG_USERNAME)
        .help("User id as returned by the identity service")
        .required(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "bluelist");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_args() {
        temp_env::with_vars_unset(
            [
                "BLUELIST_PORT",
                "BLUELIST_CLOUDANT_URL",
                "BLUELIST_CLOUDANT_USERNAME",
                "BLUELIST_CLOUDANT_PASSWORD",
                "BLUELIST_REGISTRY_DATABASE",
                "BLUELIST_AUTH_URL",
                "BLUELIST_LOG_LEVEL",
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "bluelist",
                    "--port",
                    "9090",
                    "--cloudant-url",
                    "https://acct.cloudant.com",
                    "--cloudant-username",
                    "admin",
                    "--cloudant-password",
                    "secret",
                    "--auth-url",
                    "https://auth.tld/userinfo",
                    "-vv",
                ]);

                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9090));
                assert_eq!(
                    matches
                        .get_one::<String>(cloudant::ARG_CLOUDANT_URL)
                        .cloned(),
                    Some("https://acct.cloudant.com".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<String>(cloudant::ARG_REGISTRY_DATABASE)
                        .cloned(),
                    Some("bluelist_registry".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(auth::ARG_AUTH_URL).cloned(),
                    Some("https://auth.tld/userinfo".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
                assert!(matches.subcommand().is_none());
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("BLUELIST_PORT", Some("443")),
                ("BLUELIST_CLOUDANT_URL", Some("http://localhost:5984")),
                ("BLUELIST_CLOUDANT_USERNAME", Some("admin")),
                ("BLUELIST_CLOUDANT_PASSWORD", Some("secret")),
                ("BLUELIST_REGISTRY_DATABASE", Some("registry")),
                ("BLUELIST_AUTH_URL", Some("http://localhost:9000/me")),
                ("BLUELIST_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["bluelist"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches
                        .get_one::<String>(cloudant::ARG_CLOUDANT_USERNAME)
                        .cloned(),
                    Some("admin".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<String>(cloudant::ARG_REGISTRY_DATABASE)
                        .cloned(),
                    Some("registry".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, level) in levels.iter().enumerate() {
            temp_env::with_var("BLUELIST_LOG_LEVEL", Some(level), || {
                let matches = new().get_matches_from(vec!["bluelist"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_subcommands() {
        let matches = new().get_matches_from(vec!["bluelist", "database-name", "alice"]);
        let Some((name, sub)) = matches.subcommand() else {
            panic!("expected a subcommand");
        };
        assert_eq!(name, CMD_DATABASE_NAME);
        assert_eq!(
            sub.get_one::<String>(ARG_USERNAME).cloned(),
            Some("alice".to_string())
        );

        let result = new().try_get_matches_from(vec!["bluelist", "deprovision"]);
        assert!(result.is_err());
    }
}
