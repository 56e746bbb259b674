//! File-backed table store implementation.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use tabkit_core::entity::Entity;
use tabkit_core::error::{Error, InvalidInputError, TransportError};
use tabkit_core::paging::{ContinuationToken, Page};
use tabkit_core::query::Query;
use tabkit_core::traits::TableStore;
use tabkit_core::types::{StorageUrl, TableName};
use tabkit_core::Result;

use crate::store::{DEFAULT_PAGE_SIZE, FileStore};

/// Filesystem-backed table store.
#[derive(Debug, Clone)]
pub struct FileTableStore {
    store: FileStore,
    page_size: u32,
}

impl FileTableStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            store: FileStore::new(root),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a store from a `file://` URL.
    pub fn from_url(url: &StorageUrl) -> Result<Self> {
        let path = url.to_file_path().ok_or_else(|| {
            Error::InvalidInput(InvalidInputError::StorageUrl {
                value: url.to_string(),
                reason: "file store requires a file:// URL".to_string(),
            })
        })?;
        Ok(Self::new(path))
    }

    /// Set the maximum entities per segment when a query has no `take`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Access the underlying file store.
    pub fn store(&self) -> &FileStore {
        &self.store
    }
}

/// Run a blocking store operation off the async executor.
async fn blocking<T, F>(store: &FileStore, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(FileStore) -> Result<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(store))
        .await
        .map_err(|e| Error::Transport(TransportError::Io(std::io::Error::other(e))))?
}

#[async_trait]
impl TableStore for FileTableStore {
    #[instrument(skip(self), fields(root = %self.store.root().display()))]
    async fn create_if_not_exists(&self, table: &TableName) -> Result<bool> {
        debug!("Creating table");
        let table = table.clone();
        blocking(&self.store, move |store| store.create_table(&table)).await
    }

    #[instrument(skip(self, entity), fields(root = %self.store.root().display()))]
    async fn insert_or_merge(&self, table: &TableName, entity: &Entity) -> Result<()> {
        let table = table.clone();
        let entity = entity.clone();
        blocking(&self.store, move |store| store.insert_or_merge(&table, &entity)).await
    }

    #[instrument(skip(self, query), fields(root = %self.store.root().display(), table = %query.table))]
    async fn query_segmented(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
    ) -> Result<Page<Entity>> {
        let query = query.clone();
        let token = token.cloned();
        let page_size = self.page_size;
        blocking(&self.store, move |store| {
            store.query_segment(&query, token.as_ref(), page_size)
        })
        .await
    }
}
