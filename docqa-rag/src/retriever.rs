//! Question retrieval: embed → guard the embedding space → nearest-neighbour search.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::embedding::{EmbeddingProvider, check_embeddings};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// Finds the passages most similar to a question.
///
/// The embedding provider and the collection together form one index
/// identity: before searching, the retriever compares the identity recorded at
/// ingestion with the provider's and refuses to query across embedding spaces.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::Retriever;
///
/// let retriever = Retriever::new(embedder, index);
/// let result = retriever.retrieve("Qual o faturamento da empresa?", "docs", 10).await?;
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Create a retriever over `index` using `embedding_provider` for questions.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedding_provider, index }
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Embed `question` and return the `k` most similar passages in `collection`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `k == 0`
    /// - [`RagError::IndexNotFound`] if `collection` was never ingested
    /// - [`RagError::EmbeddingSpaceMismatch`] if the collection was built with a different model
    /// - [`RagError::Embedding`] if the provider fails
    pub async fn retrieve(
        &self,
        question: &str,
        collection: &str,
        k: usize,
    ) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidInput("k must be greater than zero".to_string()));
        }
        let embedding = self.embed_question(question, collection).await?;
        self.search(collection, &embedding, k).await
    }

    /// Check the collection's identity, then embed `question` in its space.
    pub async fn embed_question(&self, question: &str, collection: &str) -> Result<Vec<f32>> {
        self.check_identity(collection).await?;

        let embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(collection, error = %e, "embedding failed during retrieval");
            e
        })?;
        check_embeddings(
            self.embedding_provider.model_name(),
            1,
            self.embedding_provider.dimensions(),
            std::slice::from_ref(&embedding),
        )?;
        Ok(embedding)
    }

    /// Query `collection` for the `k` passages nearest to `embedding`.
    pub async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidInput("k must be greater than zero".to_string()));
        }

        let result = self.index.query(collection, embedding, k).await.map_err(|e| {
            error!(collection, error = %e, "vector index query failed");
            e
        })?;

        debug!(collection, k, result_count = result.len(), "retrieved passages");
        Ok(result)
    }

    async fn check_identity(&self, collection: &str) -> Result<()> {
        let stored = self.index.collection_identity(collection).await?;
        let current = self.embedding_provider.identity();
        if stored != current {
            error!(collection, expected = %stored, actual = %current, "embedding space mismatch");
            return Err(RagError::EmbeddingSpaceMismatch {
                collection: collection.to_string(),
                expected: stored.to_string(),
                actual: current.to_string(),
            });
        }
        Ok(())
    }
}
