//! Store selection for the CLI.

use async_trait::async_trait;
use tracing::debug;

use tabkit_core::entity::Entity;
use tabkit_core::paging::{ContinuationToken, Page};
use tabkit_core::query::Query;
use tabkit_core::traits::TableStore;
use tabkit_core::types::TableName;
use tabkit_core::{Result, StorageConfig};
use tabkit_file::FileTableStore;
use tabkit_http::HttpTableStore;

/// A table store of either backend.
#[derive(Debug, Clone)]
pub enum CliStore {
    File(FileTableStore),
    Http(HttpTableStore),
}

impl CliStore {
    /// Open the store the configuration points at.
    ///
    /// `file://` URLs select the filesystem store; anything else is a table
    /// service endpoint.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        if config.storage.is_local() {
            let mut store = FileTableStore::from_url(&config.storage)?;
            if let Some(page_size) = config.page_size {
                store = store.with_page_size(page_size);
            }
            debug!(root = %store.store().root().display(), "Using file store");
            Ok(CliStore::File(store))
        } else {
            debug!(storage = %config.storage, "Using table service");
            Ok(CliStore::Http(HttpTableStore::from_config(config)))
        }
    }

    fn inner(&self) -> &dyn TableStore {
        match self {
            CliStore::File(store) => store,
            CliStore::Http(store) => store,
        }
    }
}

#[async_trait]
impl TableStore for CliStore {
    async fn create_if_not_exists(&self, table: &TableName) -> Result<bool> {
        self.inner().create_if_not_exists(table).await
    }

    async fn insert_or_merge(&self, table: &TableName, entity: &Entity) -> Result<()> {
        self.inner().insert_or_merge(table, entity).await
    }

    async fn query_segmented(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
    ) -> Result<Page<Entity>> {
        self.inner().query_segmented(query, token).await
    }
}
