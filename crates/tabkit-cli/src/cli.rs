//! CLI argument definitions.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use tabkit_core::StorageConfig;
use tabkit_core::config::DEFAULT_TABLE;
use tabkit_core::types::EMULATOR_TABLE_ENDPOINT;

use crate::commands::{count, create_table, query, seed};

/// Create, seed and query a sample table.
#[derive(Parser, Debug)]
#[command(name = "tabkit")]
#[command(author, version = env!("TABKIT_VERSION"), about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the table lives.
#[derive(Args, Debug)]
pub struct StorageArgs {
    /// Table endpoint URL, or a file:// directory for a local store.
    ///
    /// The default is the local storage emulator, which rejects unsigned
    /// requests: pass --sas with it, or use a file:// directory.
    #[arg(long, env = "TABKIT_STORAGE", default_value = EMULATOR_TABLE_ENDPOINT, global = true)]
    pub storage: String,

    /// Shared access signature query string, appended verbatim to every
    /// request. Required by the emulator and by cloud endpoints.
    #[arg(long, env = "TABKIT_SAS", global = true, hide_env_values = true)]
    pub sas: Option<String>,

    /// Table name
    #[arg(long, env = "TABKIT_TABLE", default_value = DEFAULT_TABLE, global = true)]
    pub table: String,

    /// Maximum entities per query segment
    #[arg(long, global = true)]
    pub page_size: Option<u32>,
}

impl StorageArgs {
    /// Validate the arguments into a storage configuration.
    pub fn config(&self) -> Result<StorageConfig> {
        let config = StorageConfig::new(&self.storage, &self.table, self.sas.clone())
            .context("Invalid storage configuration")?;
        Ok(config.with_page_size(self.page_size))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the table if it does not exist
    CreateTable(create_table::CreateTableArgs),

    /// Write sample records
    Seed(seed::SeedArgs),

    /// Query sample records by date
    Query(query::QueryArgs),

    /// Count every entity in the table
    Count(count::CountArgs),
}
