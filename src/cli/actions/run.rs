use crate::cli::actions::{Action, database_name, deprovision, server};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::Deprovision(args) => deprovision::execute(args).await,
        Action::DatabaseName(args) => database_name::execute(args).await,
    }
}
