//! Count command implementation.

use anyhow::{Context, Result};
use clap::Args;

use tabkit_core::{Query, StorageConfig, TableStore};

use crate::store::CliStore;

#[derive(Args, Debug)]
pub struct CountArgs {}

pub async fn run(store: &CliStore, config: &StorageConfig, _args: CountArgs) -> Result<()> {
    let entities = store
        .execute_query(&Query::new(config.table.clone()))
        .await
        .context("Failed to query table")?;

    println!("There are {} entities in {}", entities.len(), config.table);

    Ok(())
}
