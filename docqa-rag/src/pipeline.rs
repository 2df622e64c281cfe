//! Indexing pipeline.
//!
//! The [`IndexingPipeline`] rebuilds a collection from one document by
//! composing a [`DocumentLoader`], a [`Chunker`], an [`EmbeddingProvider`]
//! and a [`VectorIndex`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{IndexingPipeline, InMemoryVectorIndex, RagConfig};
//!
//! let pipeline = IndexingPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .index(Arc::new(InMemoryVectorIndex::new()))
//!     .build()?;
//!
//! let stored = pipeline.build_index(Path::new("document.pdf"), "docs").await?;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Document, Passage, PassageRecord};
use crate::embedding::{EmbeddingProvider, check_embeddings};
use crate::error::{RagError, Result};
use crate::loader::{AutoLoader, DocumentLoader};
use crate::vectorstore::VectorIndex;

/// Rebuilds a collection from a document: load → chunk → embed → replace.
///
/// Embedding runs in batches of `embed_batch_size` passages with up to
/// `embed_concurrency` requests in flight. The collection is replaced only
/// after every batch has succeeded, so a failed run leaves the previous
/// contents untouched. Construct one via [`IndexingPipeline::builder()`].
pub struct IndexingPipeline {
    config: RagConfig,
    loader: Arc<dyn DocumentLoader>,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl IndexingPipeline {
    /// Create a new [`IndexingPipelineBuilder`].
    pub fn builder() -> IndexingPipelineBuilder {
        IndexingPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Load the document at `path` with the configured loader.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Load`] if the document is unreadable or unsupported.
    pub async fn load(&self, path: &Path) -> Result<Document> {
        self.loader.load(path).await.map_err(|e| {
            error!(path = %path.display(), stage = "load", error = %e, "failed to load document");
            e
        })
    }

    /// Load the document at `path` and rebuild `collection` from it.
    ///
    /// Returns the number of passages stored. A loader failure aborts before
    /// anything is chunked.
    pub async fn build_index(&self, path: &Path, collection: &str) -> Result<usize> {
        let document = self.load(path).await?;
        self.index_document(&document, collection).await
    }

    /// Rebuild `collection` from an already loaded document.
    ///
    /// Returns the number of passages stored. An empty document still replaces
    /// the collection, leaving it present but empty.
    ///
    /// # Errors
    ///
    /// - [`RagError::Embedding`] if any batch fails; nothing is written
    /// - [`RagError::IndexWrite`] if the index rejects the replacement
    pub async fn index_document(&self, document: &Document, collection: &str) -> Result<usize> {
        let text = document.text();
        let passages = self.chunker.chunk(&text);
        if passages.is_empty() {
            warn!(document.id = %document.id, collection, "document has no text, collection will be empty");
        }

        let embeddings = self.embed_passages(&passages).await.map_err(|e| {
            error!(document.id = %document.id, collection, stage = "embed", error = %e, "embedding failed during ingestion");
            e
        })?;

        let records: Vec<PassageRecord> = passages
            .into_iter()
            .zip(embeddings)
            .map(|(passage, embedding)| to_record(document, passage, embedding))
            .collect();
        let passage_count = records.len();

        let identity = self.embedding_provider.identity();
        self.index.replace_collection(collection, &identity, records).await.map_err(|e| {
            error!(document.id = %document.id, collection, stage = "store", error = %e, "replace failed during ingestion");
            e
        })?;

        info!(document.id = %document.id, collection, passage_count, model = %identity, "indexed document");
        Ok(passage_count)
    }

    async fn embed_passages(&self, passages: &[Passage]) -> Result<Vec<Vec<f32>>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        let provider = &self.embedding_provider;

        // `buffered` yields batches in submission order, keeping text and vector paired.
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.config.embed_batch_size))
            .map(|batch| provider.embed_batch(batch))
            .buffered(self.config.embed_concurrency)
            .try_collect()
            .await?;

        let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        check_embeddings(provider.model_name(), passages.len(), provider.dimensions(), &embeddings)?;
        Ok(embeddings)
    }
}

fn to_record(document: &Document, passage: Passage, embedding: Vec<f32>) -> PassageRecord {
    let mut metadata = HashMap::new();
    metadata.insert("chunk_index".to_string(), passage.index.to_string());
    metadata.insert("page".to_string(), document.page_at(passage.source_offset).to_string());
    metadata.insert("source_offset".to_string(), passage.source_offset.to_string());
    if let Some(uri) = &document.source_uri {
        metadata.insert("source".to_string(), uri.clone());
    }

    PassageRecord {
        id: format!("{}_{}", document.id, passage.index),
        text: passage.text,
        embedding,
        metadata,
    }
}

/// Builder for constructing an [`IndexingPipeline`].
///
/// `embedding_provider` and `index` are required. Without an explicit chunker
/// the pipeline uses a [`RecursiveChunker`] sized from the config; without an
/// explicit loader it uses [`AutoLoader`]; without a config it uses
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct IndexingPipelineBuilder {
    config: Option<RagConfig>,
    loader: Option<Arc<dyn DocumentLoader>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
}

impl IndexingPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document loader.
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the passage chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index backend.
    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Build the [`IndexingPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// config is invalid.
    pub fn build(self) -> Result<IndexingPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::Config("index is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let loader = self.loader.unwrap_or_else(|| Arc::new(AutoLoader));

        Ok(IndexingPipeline { config, loader, chunker, embedding_provider, index })
    }
}
