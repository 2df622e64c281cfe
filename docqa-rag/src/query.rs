//! Grounded query pipeline.
//!
//! Each question moves through the [`QueryStage`]s in order. Any failure ends
//! the run with the error of the failing stage; there is no retry inside the
//! pipeline. A refusal is a successful [`Answer`], never an error.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::DEFAULT_TOP_K;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::prompt::{REFUSAL_SENTINEL, build_prompt};
use crate::retriever::Retriever;
use crate::vectorstore::VectorIndex;

/// The steps a question passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStage {
    EmbeddingQuestion,
    Retrieving,
    BuildingPrompt,
    Generating,
    Done,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmbeddingQuestion => "embedding_question",
            Self::Retrieving => "retrieving",
            Self::BuildingPrompt => "building_prompt",
            Self::Generating => "generating",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// The result of a successful query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// The generation provider's output, unmodified.
    pub text: String,
    /// Number of passages placed in the prompt context.
    pub passages_used: usize,
}

impl Answer {
    /// Returns `true` if the model answered with the refusal sentinel.
    ///
    /// Surrounding whitespace and a single pair of surrounding quotes are
    /// ignored; otherwise the match is exact.
    pub fn is_refusal(&self) -> bool {
        let trimmed = self.text.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .map(str::trim)
            .unwrap_or(trimmed);
        unquoted == REFUSAL_SENTINEL
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Answers questions from one collection: embed → retrieve → prompt → generate.
///
/// The pipeline holds no per-question state, so one instance can serve
/// concurrent questions. Construct one via [`QueryPipeline::builder()`].
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::QueryPipeline;
///
/// let pipeline = QueryPipeline::builder()
///     .embedding_provider(embedder)
///     .index(index)
///     .generation_provider(llm)
///     .collection("docs")
///     .build()?;
///
/// let answer = pipeline.ask("Qual o faturamento da empresa?").await?;
/// println!("{answer}");
/// ```
pub struct QueryPipeline {
    retriever: Retriever,
    generation_provider: Arc<dyn GenerationProvider>,
    collection: String,
    top_k: usize,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// The collection questions are answered from.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The number of passages retrieved per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `question` from the collection.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if the question is empty
    /// - [`RagError::IndexNotFound`] if the collection was never ingested
    /// - [`RagError::EmbeddingSpaceMismatch`] if the collection uses another embedding model
    /// - [`RagError::Embedding`] or [`RagError::Generation`] if a provider fails
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".to_string()));
        }
        let collection = self.collection.as_str();

        let mut stage = QueryStage::EmbeddingQuestion;
        debug!(collection, %stage, "query stage");
        let embedding = self
            .retriever
            .embed_question(question, collection)
            .await
            .map_err(|e| failed(stage, collection, e))?;

        stage = QueryStage::Retrieving;
        debug!(collection, %stage, "query stage");
        let retrieval = self
            .retriever
            .search(collection, &embedding, self.top_k)
            .await
            .map_err(|e| failed(stage, collection, e))?;

        stage = QueryStage::BuildingPrompt;
        debug!(collection, %stage, passage_count = retrieval.len(), "query stage");
        let prompt = build_prompt(question, &retrieval);

        stage = QueryStage::Generating;
        debug!(collection, %stage, prompt_len = prompt.len(), "query stage");
        let text = self
            .generation_provider
            .generate(&prompt)
            .await
            .map_err(|e| failed(stage, collection, e))?;

        stage = QueryStage::Done;
        let answer = Answer { text, passages_used: retrieval.len() };
        info!(
            collection,
            %stage,
            passage_count = answer.passages_used,
            refusal = answer.is_refusal(),
            "answered question"
        );
        Ok(answer)
    }
}

fn failed(stage: QueryStage, collection: &str, e: RagError) -> RagError {
    error!(collection, %stage, error = %e, "query failed");
    e
}

/// Builder for constructing a [`QueryPipeline`].
///
/// `embedding_provider`, `index`, `generation_provider` and `collection` are
/// required. `top_k` defaults to 10.
#[derive(Default)]
pub struct QueryPipelineBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    collection: Option<String>,
    top_k: Option<usize>,
}

impl QueryPipelineBuilder {
    /// Set the embedding provider used for questions.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index backend.
    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Set the collection to answer from.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Set the number of passages retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Build the [`QueryPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or `top_k` is zero.
    pub fn build(self) -> Result<QueryPipeline> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let index =
            self.index.ok_or_else(|| RagError::Config("index is required".to_string()))?;
        let generation_provider = self
            .generation_provider
            .ok_or_else(|| RagError::Config("generation_provider is required".to_string()))?;
        let collection = self
            .collection
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RagError::Config("collection is required".to_string()))?;
        let top_k = self.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }

        Ok(QueryPipeline {
            retriever: Retriever::new(embedding_provider, index),
            generation_provider,
            collection,
            top_k,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> Answer {
        Answer { text: text.to_string(), passages_used: 0 }
    }

    #[test]
    fn refusal_detection_tolerates_quotes_and_whitespace() {
        assert!(answer(REFUSAL_SENTINEL).is_refusal());
        assert!(answer(&format!("  \"{REFUSAL_SENTINEL}\"\n")).is_refusal());
        assert!(!answer("A receita foi de R$ 722.875.391,46.").is_refusal());
        assert!(!answer(&format!("{REFUSAL_SENTINEL} Mas talvez...")).is_refusal());
    }

    #[test]
    fn stages_render_as_snake_case() {
        assert_eq!(QueryStage::EmbeddingQuestion.to_string(), "embedding_question");
        assert_eq!(QueryStage::Done.to_string(), "done");
    }
}
