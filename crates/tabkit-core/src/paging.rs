//! Segmented-query paging.
//!
//! A table service answers a query one segment at a time. Each segment
//! carries an optional [`ContinuationToken`] telling the caller where the next
//! segment starts. [`collect_all`] drives any [`SegmentSource`] until the
//! token runs out and returns every item in fetch order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::query::Query;

/// Cursor marking where the next segment of a query resumes.
///
/// Mirrors the `NextPartitionKey` / `NextRowKey` pair the table service
/// returns. Treat as opaque outside of store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub next_partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_row_key: Option<String>,
}

impl ContinuationToken {
    pub fn new(next_partition_key: impl Into<String>, next_row_key: Option<String>) -> Self {
        Self {
            next_partition_key: next_partition_key.into(),
            next_row_key,
        }
    }

    /// An empty token carries no position and ends a query like a missing one.
    pub fn is_empty(&self) -> bool {
        self.next_partition_key.is_empty() && self.next_row_key.as_deref().is_none_or(str::is_empty)
    }
}

/// One segment of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items in the order the store returned them.
    pub items: Vec<T>,

    /// Where the next segment starts, if more results exist.
    pub continuation: Option<ContinuationToken>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation: Option<ContinuationToken>) -> Self {
        Self {
            items,
            continuation,
        }
    }

    /// A final segment.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// Returns true if no segment follows this one.
    pub fn is_last(&self) -> bool {
        self.continuation.as_ref().is_none_or(ContinuationToken::is_empty)
    }

    /// Transform the items, keeping the continuation.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            continuation: self.continuation,
        }
    }
}

/// Something that can fetch one segment of a query.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Item type of each segment.
    type Item: Send;
    /// Error reported by a failed fetch.
    type Error: Send;

    /// Fetch the segment starting at `token`, or the first segment if `None`.
    async fn fetch_segment(
        &self,
        query: &Query,
        token: Option<&ContinuationToken>,
    ) -> Result<Page<Self::Item>, Self::Error>;
}

/// Fetch every segment of `query` and concatenate the items in order.
///
/// Segments are fetched one after another, each resuming from the token the
/// previous one returned, until a segment arrives without a token. An empty
/// segment that still carries a token does not end the query. Items are
/// neither deduplicated nor reordered.
///
/// # Errors
///
/// The first failed fetch is returned as-is and the items gathered so far are
/// discarded. Nothing is retried.
#[instrument(skip_all, fields(table = %query.table))]
pub async fn collect_all<S>(source: &S, query: &Query) -> Result<Vec<S::Item>, S::Error>
where
    S: SegmentSource + ?Sized,
{
    let mut items = Vec::new();
    let mut token: Option<ContinuationToken> = None;
    let mut segments = 0usize;

    loop {
        let page = source.fetch_segment(query, token.as_ref()).await?;
        segments += 1;

        trace!(
            segment = segments,
            items = page.items.len(),
            more = !page.is_last(),
            "Fetched segment"
        );

        let last = page.is_last();
        items.extend(page.items);

        if last {
            break;
        }
        token = page.continuation;
    }

    debug!(segments, total = items.len(), "Query drained");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::types::TableName;

    #[derive(Debug, PartialEq)]
    struct FetchFailed(usize);

    /// Serves canned pages and records the token of every call.
    struct ScriptedSource {
        pages: Vec<Page<u32>>,
        fail_at: Option<usize>,
        calls: Mutex<Vec<Option<ContinuationToken>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Page<u32>>) -> Self {
            Self {
                pages,
                fail_at: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_at(mut self, call: usize) -> Self {
            self.fail_at = Some(call);
            self
        }

        fn calls(&self) -> Vec<Option<ContinuationToken>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SegmentSource for ScriptedSource {
        type Item = u32;
        type Error = FetchFailed;

        async fn fetch_segment(
            &self,
            _query: &Query,
            token: Option<&ContinuationToken>,
        ) -> Result<Page<u32>, FetchFailed> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(token.cloned());
                calls.len() - 1
            };

            if self.fail_at == Some(call) {
                return Err(FetchFailed(call));
            }

            Ok(self.pages[call].clone())
        }
    }

    fn token(n: u32) -> Option<ContinuationToken> {
        Some(ContinuationToken::new("Sample", Some(format!("row{}", n))))
    }

    fn query() -> Query {
        Query::new(TableName::new("Test").unwrap())
    }

    #[tokio::test]
    async fn concatenates_pages_in_order() {
        let source = ScriptedSource::new(vec![
            Page::new(vec![1, 2], token(1)),
            Page::new(vec![3], token(2)),
            Page::last(vec![4, 5]),
        ]);

        let items = collect_all(&source, &query()).await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(source.calls(), vec![None, token(1), token(2)]);
    }

    #[tokio::test]
    async fn single_page_fetches_once() {
        let source = ScriptedSource::new(vec![Page::last(vec![7, 8])]);

        let items = collect_all(&source, &query()).await.unwrap();

        assert_eq!(items, vec![7, 8]);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_token_ends_query() {
        let source = ScriptedSource::new(vec![Page::new(
            vec![1],
            Some(ContinuationToken::new("", None)),
        )]);

        let items = collect_all(&source, &query()).await.unwrap();

        assert_eq!(items, vec![1]);
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_intermediate_page_continues() {
        let source = ScriptedSource::new(vec![
            Page::new(vec![1], token(1)),
            Page::new(vec![], token(2)),
            Page::last(vec![2]),
        ]);

        let items = collect_all(&source, &query()).await.unwrap();

        assert_eq!(items, vec![1, 2]);
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test]
    async fn duplicates_pass_through() {
        let source = ScriptedSource::new(vec![
            Page::new(vec![1, 1], token(1)),
            Page::last(vec![1]),
        ]);

        let items = collect_all(&source, &query()).await.unwrap();

        assert_eq!(items, vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn failure_discards_partial_results() {
        let source = ScriptedSource::new(vec![
            Page::new(vec![1], token(1)),
            Page::new(vec![2], token(2)),
            Page::last(vec![3]),
        ])
        .failing_at(1);

        let result = collect_all(&source, &query()).await;

        assert_eq!(result, Err(FetchFailed(1)));
        assert_eq!(source.calls().len(), 2);
    }

    #[test]
    fn page_map_keeps_continuation() {
        let page = Page::new(vec![1, 2], token(9)).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.continuation, token(9));
        assert!(!page.is_last());
    }
}
