//! HTTP-backed table store implementation.

use async_trait::async_trait;
use tracing::{debug, instrument};

use tabkit_core::config::StorageConfig;
use tabkit_core::entity::Entity;
use tabkit_core::paging::{ContinuationToken, Page};
use tabkit_core::query::Query;
use tabkit_core::traits::TableStore;
use tabkit_core::types::{SasToken, StorageUrl, TableName};
use tabkit_core::Result;

use crate::client::TableClient;

/// A network table store using the table service REST API.
#[derive(Debug, Clone)]
pub struct HttpTableStore {
    client: TableClient,
    page_size: Option<u32>,
}

impl HttpTableStore {
    /// Create a store for the given endpoint.
    pub fn new(storage: StorageUrl, sas: Option<SasToken>) -> Self {
        Self {
            client: TableClient::new(storage, sas),
            page_size: None,
        }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.storage.clone(), config.sas.clone()).with_page_size(config.page_size)
    }

    /// Request at most `page_size` entities per segment when a query has no `take`.
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the endpoint URL for this store.
    pub fn url(&self) -> &StorageUrl {
        self.client.storage()
    }
}

#[async_trait]
impl TableStore for HttpTableStore {
    #[instrument(skip(self), fields(storage = %self.url()))]
    async fn create_if_not_exists(&self, table: &TableName) -> Result<bool> {
        let created = self.client.create_table(table).await?;
        debug!(created, "Table ready");
        Ok(created)
    }

    async fn insert_or_merge(&self, table: &TableName, entity: &Entity) -> Result<()> {
        self.client.merge_entity(table, entity).await
    }

    async fn query_segmented(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
    ) -> Result<Page<Entity>> {
        self.client
            .query_entities(query, token, self.page_size)
            .await
    }
}
