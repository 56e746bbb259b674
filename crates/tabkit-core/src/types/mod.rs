//! Core table storage types.
//!
//! These types enforce service invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod sas_token;
mod storage_url;
mod table_name;

pub use sas_token::SasToken;
pub use storage_url::{EMULATOR_TABLE_ENDPOINT, StorageUrl};
pub use table_name::TableName;
