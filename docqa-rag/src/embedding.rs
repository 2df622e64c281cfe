//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::document::IndexIdentity;
use crate::error::{ProviderFailure, RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (OpenAI, Gemini, etc.)
/// behind a unified async interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// Every vector returned by one provider has [`dimensions()`](EmbeddingProvider::dimensions)
/// elements.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Provider-qualified model name, e.g. `openai/text-embedding-3-small`.
    fn model_name(&self) -> &str;

    /// The embedding space this provider produces vectors in.
    fn identity(&self) -> IndexIdentity {
        IndexIdentity::new(self.model_name(), self.dimensions())
    }
}

/// Verify that a provider returned one vector of the expected size per input.
pub(crate) fn check_embeddings(
    provider: &str,
    expected_count: usize,
    dimensions: usize,
    embeddings: &[Vec<f32>],
) -> Result<()> {
    if embeddings.len() != expected_count {
        return Err(RagError::embedding(
            provider,
            ProviderFailure::MalformedResponse,
            format!("expected {expected_count} embeddings, got {}", embeddings.len()),
        ));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(RagError::embedding(
            provider,
            ProviderFailure::MalformedResponse,
            format!("expected {dimensions}-dimensional embeddings, got {}", bad.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_mismatch_is_malformed() {
        let err = check_embeddings("p", 2, 3, &[vec![0.0; 3]]).unwrap_err();
        assert!(matches!(
            err,
            RagError::Embedding { kind: ProviderFailure::MalformedResponse, .. }
        ));
    }

    #[test]
    fn dimension_mismatch_is_malformed() {
        assert!(check_embeddings("p", 2, 3, &[vec![0.0; 3], vec![0.0; 4]]).is_err());
        assert!(check_embeddings("p", 2, 3, &[vec![0.0; 3], vec![1.0; 3]]).is_ok());
    }
}
