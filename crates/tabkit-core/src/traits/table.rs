//! Table store trait.

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::Error;
use crate::paging::{ContinuationToken, Page, SegmentSource, collect_all};
use crate::query::Query;
use crate::types::TableName;
use crate::Result;

/// A table storage backend.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create `table` unless it already exists.
    ///
    /// Returns true if the table was created by this call.
    async fn create_if_not_exists(&self, table: &TableName) -> Result<bool>;

    /// Insert `entity`, or merge its properties into the existing entity
    /// with the same keys.
    async fn insert_or_merge(&self, table: &TableName, entity: &Entity) -> Result<()>;

    /// Fetch one segment of `query`, resuming at `token`.
    async fn query_segmented(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
    ) -> Result<Page<Entity>>;

    /// Fetch every segment of `query`.
    async fn execute_query(&self, query: &Query) -> Result<Vec<Entity>> {
        collect_all(&TableSegments::new(self), query).await
    }
}

/// Adapts a [`TableStore`] to the [`SegmentSource`] the paging helpers drive.
#[derive(Debug)]
pub struct TableSegments<'a, T: ?Sized> {
    store: &'a T,
}

impl<'a, T: ?Sized> TableSegments<'a, T> {
    pub fn new(store: &'a T) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<T> SegmentSource for TableSegments<'_, T>
where
    T: TableStore + ?Sized,
{
    type Item = Entity;
    type Error = Error;

    async fn fetch_segment(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
    ) -> Result<Page<Entity>> {
        self.store.query_segmented(query, token).await
    }
}
