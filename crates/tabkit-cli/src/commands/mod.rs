//! Subcommand implementations.

pub mod count;
pub mod create_table;
pub mod query;
pub mod seed;

use anyhow::Result;

use crate::cli::{Commands, StorageArgs};
use crate::store::CliStore;

pub async fn handle(storage: StorageArgs, command: Commands) -> Result<()> {
    let config = storage.config()?;
    let store = CliStore::open(&config)?;

    match command {
        Commands::CreateTable(args) => create_table::run(&store, &config, args).await,
        Commands::Seed(args) => seed::run(&store, &config, args).await,
        Commands::Query(args) => query::run(&store, &config, args).await,
        Commands::Count(args) => count::run(&store, &config, args).await,
    }
}
