//! # BlueList
//!
//! `bluelist` provisions one Cloudant database per mobile user and keeps the
//! user's session with that database alive.
//!
//! ## Backend
//!
//! Two endpoints sit in front of Cloudant:
//!
//! - `PUT /bluelist/enroll` resolves the caller's `Authorization` header to a
//!   user id, creates (or reuses) the database `todosdb_<sha1(user)>`, installs
//!   the data-type views and the `@datatype` query index on first creation,
//!   issues a per-database API key and returns a Cloudant session cookie.
//! - `POST /bluelist/sessioncookie` returns a fresh session cookie for an
//!   already enrolled user.
//!
//! Creating an existing database and deleting a missing one both count as
//! success. A view or index failure after the database was created is
//! reported with the database name so the partial state is visible.
//!
//! ## Client
//!
//! [`client`] is the device side: it enrolls, keeps the session cookie in a
//! [`client::SessionCookieInterceptor`] and talks to the user's database
//! through it. On `401`/`403` the cookie is refreshed once (a single refresh
//! shared by every concurrent request) and the request retried once.

pub mod api;
pub mod cli;
pub mod client;
pub mod cloudant;
pub mod todo;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
