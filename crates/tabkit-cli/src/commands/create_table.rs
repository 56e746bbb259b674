//! Create table command implementation.

use anyhow::{Context, Result};
use clap::Args;

use tabkit_core::{StorageConfig, TableStore};

use crate::output;
use crate::store::CliStore;

#[derive(Args, Debug)]
pub struct CreateTableArgs {}

pub async fn run(store: &CliStore, config: &StorageConfig, _args: CreateTableArgs) -> Result<()> {
    let created = store
        .create_if_not_exists(&config.table)
        .await
        .context("Failed to create table")?;

    if created {
        output::success(&format!("Created table {}", config.table));
    } else {
        output::success(&format!("Table {} already exists", config.table));
    }
    output::field("Storage", config.storage.as_str());

    Ok(())
}
