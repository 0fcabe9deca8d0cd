use crate::cloudant::database_name;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub username: String,
}

/// Print the database name of a user.
/// # Errors
/// Never fails; returns `Result` like every other action.
#[allow(clippy::unused_async)]
pub async fn execute(args: Args) -> Result<()> {
    println!("{}", database_name(&args.username));

    Ok(())
}
