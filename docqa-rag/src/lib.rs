//! Grounded question answering over a single ingested document.
//!
//! This crate provides:
//! - Document loading ([`TextLoader`], [`AutoLoader`], `PdfLoader` with the `pdf` feature)
//! - Passage chunking with exact overlap ([`RecursiveChunker`], [`FixedSizeChunker`])
//! - Embedding and generation provider traits with OpenAI and Gemini backends
//! - A [`VectorIndex`] contract with atomic collection replacement
//!   ([`InMemoryVectorIndex`], `PgVectorIndex` with the `pgvector` feature)
//! - The [`IndexingPipeline`] and the grounded [`QueryPipeline`]
//!
//! The query pipeline instructs the model to answer only from the retrieved
//! passages and to reply with [`REFUSAL_SENTINEL`] otherwise. Nothing verifies
//! the generated answer against the context; the refusal is as reliable as the
//! model's adherence to the instruction.
//!
//! # Features
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `openai` | [`openai`] providers |
//! | `gemini` | [`gemini`] providers |
//! | `pgvector` | [`pgvector`] index backend |
//! | `pdf` | `PdfLoader` |
//! | `full` | all of the above |

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod loader;
pub mod mock;
pub mod pipeline;
pub mod prompt;
pub mod query;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Document, IndexIdentity, Passage, PassageRecord, RetrievalResult, ScoredPassage,
};
pub use embedding::EmbeddingProvider;
pub use error::{ProviderFailure, RagError, Result};
pub use generation::GenerationProvider;
pub use inmemory::InMemoryVectorIndex;
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
pub use loader::{AutoLoader, DocumentLoader, TextLoader};
pub use pipeline::{IndexingPipeline, IndexingPipelineBuilder};
pub use prompt::{REFUSAL_SENTINEL, build_prompt};
pub use query::{Answer, QueryPipeline, QueryPipelineBuilder, QueryStage};
pub use retriever::Retriever;
pub use vectorstore::VectorIndex;
