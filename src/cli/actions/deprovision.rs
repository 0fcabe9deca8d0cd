use crate::{
    cli::commands::cloudant,
    cloudant::{Cloudant, Deletion, Endpoint, database_name},
};
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub username: String,
    pub cloudant: cloudant::Options,
}

/// Delete the user's database and forget its API key, so a later enroll
/// starts from scratch.
/// # Errors
/// Returns an error if Cloudant refuses either deletion.
pub async fn execute(args: Args) -> Result<()> {
    let endpoint = Endpoint::parse(&args.cloudant.url).context("invalid Cloudant URL")?;
    let cloudant = Cloudant::new(endpoint, args.cloudant.username, args.cloudant.password)?;

    let database = database_name(&args.username);

    let deletion = cloudant.delete_database(&database).await?;
    let forgotten = cloudant
        .forget_credentials(&args.cloudant.registry, &database)
        .await?;

    match deletion {
        Deletion::Deleted => info!("Deleted database {database} of user {}", args.username),
        Deletion::NotFound => info!("User {} had no database {database}", args.username),
    }
    if forgotten {
        info!("Removed stored credentials for {database}");
    }

    Ok(())
}
