//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryVectorIndex`], a zero-dependency index
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and single-process use.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{IndexIdentity, PassageRecord, RetrievalResult, ScoredPassage};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct Collection {
    identity: IndexIdentity,
    records: Vec<PassageRecord>,
}

/// An in-memory vector index using cosine similarity for search.
///
/// Each collection is held behind an `Arc`; replacement builds the new
/// collection first and then swaps the pointer under the write lock, so a
/// concurrent query sees either the old or the new contents.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.replace_collection("docs", &identity, records).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl InMemoryVectorIndex {
    /// Create a new empty in-memory vector index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in `name`, or `None` if it does not exist.
    pub async fn collection_len(&self, name: &str) -> Option<usize> {
        self.collections.read().await.get(name).map(|c| c.records.len())
    }

    async fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RagError::IndexNotFound { collection: name.to_string() })
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn replace_collection(
        &self,
        name: &str,
        identity: &IndexIdentity,
        records: Vec<PassageRecord>,
    ) -> Result<()> {
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != identity.dimensions) {
            return Err(RagError::IndexWrite {
                backend: BACKEND.to_string(),
                message: format!(
                    "record '{}' has {} dimensions, collection expects {}",
                    bad.id,
                    bad.embedding.len(),
                    identity.dimensions
                ),
            });
        }

        let count = records.len();
        let replacement = Arc::new(Collection { identity: identity.clone(), records });
        self.collections.write().await.insert(name.to_string(), replacement);

        debug!(collection = name, count, "replaced in-memory collection");
        Ok(())
    }

    async fn collection_identity(&self, name: &str) -> Result<IndexIdentity> {
        Ok(self.collection(name).await?.identity.clone())
    }

    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<RetrievalResult> {
        // Clone the Arc and release the lock before scoring.
        let collection = self.collection(name).await?;

        let mut scored: Vec<(f32, &PassageRecord)> = collection
            .records
            .iter()
            .map(|record| (cosine_similarity(&record.embedding, embedding), record))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        let passages = scored
            .into_iter()
            .map(|(score, record)| ScoredPassage {
                text: record.text.clone(),
                score,
                metadata: record.metadata.clone(),
            })
            .collect();

        Ok(RetrievalResult::new(passages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
