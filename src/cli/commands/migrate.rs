use anyhow::Context;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let database = &config().database;
    let url = DatabaseManager::require_url(database)?;

    let pool = DatabaseManager::connect_pool(url, database)
        .await
        .context("failed to connect to the database")?;
    DatabaseManager::migrate(&pool).await?;

    output_success(&output_format, "Migrations applied", None)
}
