//! tabkit-core - Core table storage types, entity codec and paging.
//!
//! Stores implement [`TableStore`]; [`collect_all`] drains a segmented query
//! from any [`SegmentSource`]; [`entity::sample`] projects the sample record
//! onto storable entities.
//!
//! # Example
//!
//! ```no_run
//! use tabkit_core::entity::sample::{self, SampleRecord};
//! use tabkit_core::{Filter, Query, TableName, TableStore};
//!
//! # async fn example(store: &dyn TableStore) -> tabkit_core::Result<()> {
//! let table = TableName::new("Test")?;
//! store.create_if_not_exists(&table).await?;
//!
//! let mut record = SampleRecord::new().with_names(["Test12", "Test2400"]);
//! store.insert_or_merge(&table, &sample::encode(&mut record)?).await?;
//!
//! let query = Query::new(table).with_filter(Filter::gt("NextDate", chrono::Utc::now()));
//! for entity in store.execute_query(&query).await? {
//!     println!("{:?}", sample::decode(entity).names);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod paging;
pub mod query;
pub mod traits;
pub mod types;

pub use config::StorageConfig;
pub use entity::{Entity, Properties, PropertyValue, SampleRecord};
pub use error::Error;
pub use paging::{ContinuationToken, Page, SegmentSource, collect_all};
pub use query::{CompareOp, Filter, Query};
pub use traits::{TableSegments, TableStore};
pub use types::{SasToken, StorageUrl, TableName};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
