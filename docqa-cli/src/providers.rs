//! Builds the provider pair and the pipelines from an [`AppConfig`].

use std::sync::Arc;

use docqa_rag::gemini::{GeminiEmbeddingProvider, GeminiGenerationProvider};
use docqa_rag::openai::{OpenAIEmbeddingProvider, OpenAIGenerationProvider};
use docqa_rag::pgvector::PgVectorIndex;
use docqa_rag::{
    EmbeddingProvider, GenerationProvider, IndexingPipeline, QueryPipeline, Result, VectorIndex,
};
use tracing::info;

use crate::config::{AppConfig, ProviderChoice};

/// Build the embedding provider for `choice`.
pub fn embedding_provider(choice: &ProviderChoice) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match choice {
        ProviderChoice::OpenAI { api_key, embedding_model, base_url, .. } => {
            let mut provider =
                OpenAIEmbeddingProvider::new(api_key.as_str())?.with_model(embedding_model.as_str());
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url.as_str());
            }
            Arc::new(provider)
        }
        ProviderChoice::Gemini { api_key, embedding_model, base_url, .. } => {
            let mut provider =
                GeminiEmbeddingProvider::new(api_key.as_str())?.with_model(embedding_model);
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url.as_str());
            }
            Arc::new(provider)
        }
    };
    Ok(provider)
}

/// Build the generation provider for `choice`.
pub fn generation_provider(choice: &ProviderChoice) -> Result<Arc<dyn GenerationProvider>> {
    let provider: Arc<dyn GenerationProvider> = match choice {
        ProviderChoice::OpenAI { api_key, chat_model, base_url, .. } => {
            let mut provider =
                OpenAIGenerationProvider::new(api_key.as_str())?.with_model(chat_model.as_str());
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url.as_str());
            }
            Arc::new(provider)
        }
        ProviderChoice::Gemini { api_key, chat_model, base_url, .. } => {
            let mut provider =
                GeminiGenerationProvider::new(api_key.as_str())?.with_model(chat_model);
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url.as_str());
            }
            Arc::new(provider)
        }
    };
    Ok(provider)
}

/// Connect to the pgvector database.
pub async fn connect_index(config: &AppConfig) -> Result<Arc<dyn VectorIndex>> {
    let index = PgVectorIndex::connect(&config.database_url).await?;
    Ok(Arc::new(index))
}

/// Build the indexing pipeline against the configured database.
pub async fn indexing_pipeline(config: &AppConfig) -> Result<IndexingPipeline> {
    let embedder = embedding_provider(&config.provider)?;
    info!(provider = %config.provider.kind(), model = embedder.model_name(), "using embedding provider");

    IndexingPipeline::builder()
        .config(config.rag.clone())
        .embedding_provider(embedder)
        .index(connect_index(config).await?)
        .build()
}

/// Build the query pipeline against the configured database and collection.
pub async fn query_pipeline(config: &AppConfig) -> Result<QueryPipeline> {
    let embedder = embedding_provider(&config.provider)?;
    let llm = generation_provider(&config.provider)?;
    info!(
        provider = %config.provider.kind(),
        embedding_model = embedder.model_name(),
        generation_model = llm.model_name(),
        "using providers"
    );

    QueryPipeline::builder()
        .embedding_provider(embedder)
        .generation_provider(llm)
        .index(connect_index(config).await?)
        .collection(config.collection.as_str())
        .top_k(config.rag.top_k)
        .build()
}
