use super::Error;
use regex::Regex;
use sha1::{Digest, Sha1};
use tracing::debug;

pub const DATABASE_PREFIX: &str = "todosdb";

/// Database owned by `user`: `todosdb_` followed by the lowercase hex SHA-1 of
/// the user name.
#[must_use]
pub fn database_name(user: &str) -> String {
    let digest = Sha1::digest(user.as_bytes());
    let name = format!("{DATABASE_PREFIX}_{}", hex::encode(digest));

    debug!("User ({user}); database name = {name}");

    name
}

/// CouchDB accepts lowercase names starting with a letter.
pub fn validate_name(name: &str) -> Result<(), Error> {
    if Regex::new(r"^[a-z][a-z0-9_$()+/-]*$").is_ok_and(|re| re.is_match(name)) {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_prefix_and_sha1_hex() {
        assert_eq!(
            database_name("abc"),
            "todosdb_a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            database_name(""),
            "todosdb_da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn name_is_stable_and_well_formed() {
        let first = database_name("alice");
        let second = database_name("alice");
        assert_eq!(first, second);

        let hash = first.strip_prefix("todosdb_").unwrap_or_default();
        assert_eq!(hash.len(), 40);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(validate_name(&first).is_ok());
    }

    #[test]
    fn different_users_get_different_databases() {
        assert_ne!(database_name("alice"), database_name("bob"));
        assert_ne!(database_name("alice"), database_name("Alice"));
    }

    #[test]
    fn validate_name_rejects_invalid_names() {
        assert!(validate_name("bluelist_registry").is_ok());
        assert!(validate_name("Todos").is_err());
        assert!(validate_name("_users").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("1db").is_err());
    }
}
