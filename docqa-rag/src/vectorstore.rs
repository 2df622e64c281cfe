//! Vector index trait for storing and searching passage embeddings.

use async_trait::async_trait;

use crate::document::{IndexIdentity, PassageRecord, RetrievalResult};
use crate::error::Result;

/// A storage backend holding named collections of embedded passages.
///
/// A collection is replaced wholesale, never appended to: ingestion swaps in a
/// complete new collection so that passages from an earlier document can never
/// be retrieved after a re-ingest, and readers never observe a half-written
/// collection.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.replace_collection("docs", &identity, records).await?;
/// let results = index.query("docs", &query_embedding, 10).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Atomically replace the contents of `name` with `records`.
    ///
    /// Creates the collection if it does not exist. An empty `records` leaves
    /// an existing, empty collection behind. On error the previous contents
    /// remain in place and [`RagError::IndexWrite`](crate::RagError::IndexWrite)
    /// is returned.
    async fn replace_collection(
        &self,
        name: &str,
        identity: &IndexIdentity,
        records: Vec<PassageRecord>,
    ) -> Result<()>;

    /// The embedding space the collection was built in.
    ///
    /// Returns [`RagError::IndexNotFound`](crate::RagError::IndexNotFound) if
    /// the collection was never created.
    async fn collection_identity(&self, name: &str) -> Result<IndexIdentity>;

    /// Return the `k` records most similar to `embedding`, most similar first.
    ///
    /// Returns [`RagError::IndexNotFound`](crate::RagError::IndexNotFound) if
    /// the collection was never created. An existing empty collection yields an
    /// empty result.
    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<RetrievalResult>;
}
