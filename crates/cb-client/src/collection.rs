//! Collection queries and the record source seam.

use crate::error::ClientResult;
use crate::rql::RqlFilter;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// A query against one platform collection: path, filter, and ordering.
#[derive(Debug, Clone)]
pub struct CollectionQuery {
    path: String,
    filter: RqlFilter,
    ordering: Option<String>,
}

impl CollectionQuery {
    /// Creates a query against the given collection path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filter: RqlFilter::new(),
            ordering: None,
        }
    }

    /// Sets the filter descriptor.
    pub fn filter(mut self, filter: RqlFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the ordering key, e.g. `-created` for most-recent-first.
    pub fn order_by(mut self, key: impl Into<String>) -> Self {
        self.ordering = Some(key.into());
        self
    }

    /// The collection path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Renders the request path with query string for one page.
    pub fn page_path(&self, limit: usize, offset: u64) -> String {
        let mut parts = Vec::new();
        if !self.filter.is_empty() {
            parts.push(format!(
                "filter={}",
                urlencoding::encode(&self.filter.to_query())
            ));
        }
        if let Some(ordering) = &self.ordering {
            parts.push(format!("ordering={}", urlencoding::encode(ordering)));
        }
        parts.push(format!("limit={}", limit));
        parts.push(format!("offset={}", offset));
        format!("{}?{}", self.path, parts.join("&"))
    }
}

/// A source of records satisfying a collection query.
///
/// Implemented by [`crate::CommerceClient`] over HTTP and by
/// [`crate::testing::MockCommercePlatform`] for tests. No caching: every
/// enumeration re-queries the source.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Total number of records matching the query.
    async fn count(&self, query: &CollectionQuery) -> ClientResult<u64>;

    /// Lazy enumeration of matching records, fetched page by page in the
    /// query's ordering. Retrieval errors end the stream.
    fn records(&self, query: &CollectionQuery) -> BoxStream<'_, ClientResult<Value>>;
}
