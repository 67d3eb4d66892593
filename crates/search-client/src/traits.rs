//! SearchClient trait definition.

use serde_json::Value;

use crate::error::TransportError;
use crate::types::{IndexStats, MultiGetEntry, RandomPage, ScrollPage, SourceDocument};

/// Read-only operations the verifier needs from a search deployment.
///
/// Implementations hide version-specific request and response shapes: every
/// method returns the normalized form regardless of the service version.
///
/// # Usage Pattern
///
/// Verification code is generic over the client:
///
/// ```ignore
/// pub async fn compare_stats<S, D>(source: &S, destination: &D) -> Result<()>
/// where
///     S: SearchClient + ?Sized,
///     D: SearchClient + ?Sized,
/// {
///     let old = source.stats("content").await?;
///     let new = destination.stats("content").await?;
///     // ...
/// }
/// ```
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetch document count and store size for an index.
    async fn stats(&self, index: &str) -> Result<IndexStats, TransportError>;

    /// Fetch the field mapping of an index, normalized so that the returned
    /// value is keyed by document type (or holds `properties` directly for
    /// typeless services).
    async fn mapping(&self, index: &str) -> Result<Value, TransportError>;

    /// Open a scroll cursor over every document in an index.
    ///
    /// `page_size` is a hint; a service may return more or fewer documents
    /// per page.
    async fn open_scroll(
        &self,
        index: &str,
        page_size: usize,
    ) -> Result<ScrollPage, TransportError>;

    /// Fetch the next page of an open scroll cursor.
    async fn next_scroll(&self, scroll_id: &str) -> Result<ScrollPage, TransportError>;

    /// Release a scroll cursor.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), TransportError>;

    /// Fetch one page of documents ordered by a seeded random-ranking function.
    async fn random_search(
        &self,
        index: &str,
        page: RandomPage,
    ) -> Result<Vec<SourceDocument>, TransportError>;

    /// Look up several documents by id in a single request.
    ///
    /// Returns one entry per requested id, in request order.
    async fn multi_get(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<Vec<MultiGetEntry>, TransportError>;
}
