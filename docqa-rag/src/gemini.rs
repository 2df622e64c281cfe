//! Gemini embedding and generation providers over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{EmbeddingProvider, check_embeddings};
use crate::error::{ProviderFailure, RagError, Result};
use crate::generation::GenerationProvider;

/// The default Generative Language API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";

/// The default generation model.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash-exp";

const PROVIDER: &str = "Gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// The API addresses models as `models/<name>`.
fn qualify_model(model: &str) -> String {
    if model.starts_with("models/") { model.to_string() } else { format!("models/{model}") }
}

fn default_dimensions(model: &str) -> usize {
    match model {
        "models/gemini-embedding-001" => 3072,
        _ => 768,
    }
}

fn require_key(api_key: String) -> Result<String> {
    if api_key.is_empty() {
        return Err(RagError::Config("Gemini API key must not be empty".into()));
    }
    Ok(api_key)
}

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// Passages are embedded with task type `RETRIEVAL_DOCUMENT` through
/// `batchEmbedContents`; single texts (questions) use `RETRIEVAL_QUERY`.
/// Both task types share one embedding space.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    model_name: String,
    dimensions: usize,
    output_dimensionality: Option<usize>,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider using the given API key and the default
    /// `models/embedding-001` model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = require_key(api_key.into())?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            model_name: format!("gemini/{DEFAULT_EMBEDDING_MODEL}"),
            dimensions: default_dimensions(DEFAULT_EMBEDDING_MODEL),
            output_dimensionality: None,
        })
    }

    /// Set the embedding model (with or without the `models/` prefix).
    pub fn with_model(mut self, model: impl AsRef<str>) -> Self {
        self.model = qualify_model(model.as_ref());
        self.model_name = format!("gemini/{}", self.model);
        if self.output_dimensionality.is_none() {
            self.dimensions = default_dimensions(&self.model);
        }
        self
    }

    /// Set the output dimensionality (truncates the embedding vector).
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self.dimensions = dims;
        self
    }

    /// Use a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request<'a>(&'a self, text: &'a str, task_type: &'static str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model,
            content: Content { parts: vec![Part { text }] },
            task_type,
            output_dimensionality: self.output_dimensionality,
        }
    }

    async fn send_batch(&self, requests: Vec<EmbedContentRequest<'_>>) -> Result<Vec<Vec<f32>>> {
        let expected = requests.len();
        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model);

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&BatchEmbedRequest { requests })
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                RagError::embedding(PROVIDER, ProviderFailure::Transport, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %detail, "embedding API error");
            return Err(RagError::embedding(PROVIDER, ProviderFailure::Rejected, detail));
        }

        let batch: BatchEmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse embedding response");
            RagError::embedding(
                PROVIDER,
                ProviderFailure::MalformedResponse,
                format!("failed to parse response: {e}"),
            )
        })?;

        let embeddings: Vec<Vec<f32>> = batch.embeddings.into_iter().map(|e| e.values).collect();
        check_embeddings(PROVIDER, expected, self.dimensions, &embeddings)?;
        Ok(embeddings)
    }
}

// ── Generative Language API request/response types ─────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct UserContent<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<UserContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.send_batch(vec![self.request(text, "RETRIEVAL_QUERY")]).await?;
        results.into_iter().next().ok_or_else(|| {
            RagError::embedding(
                PROVIDER,
                ProviderFailure::MalformedResponse,
                "API returned empty response",
            )
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let requests = texts.iter().map(|t| self.request(t, "RETRIEVAL_DOCUMENT")).collect();
        self.send_batch(requests).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// A [`GenerationProvider`] backed by the Gemini `generateContent` API at temperature 0.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::GeminiGenerationProvider;
///
/// let llm = GeminiGenerationProvider::new("your-api-key")?;
/// let answer = llm.generate(&prompt).await?;
/// ```
pub struct GeminiGenerationProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    model_name: String,
}

impl GeminiGenerationProvider {
    /// Create a new provider using the given API key and `gemini-2.0-flash-exp`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = require_key(api_key.into())?;
        let model = qualify_model(DEFAULT_CHAT_MODEL);

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE.into(),
            model_name: format!("gemini/{model}"),
            model,
        })
    }

    /// Set the generation model (with or without the `models/` prefix).
    pub fn with_model(mut self, model: impl AsRef<str>) -> Self {
        self.model = qualify_model(model.as_ref());
        self.model_name = format!("gemini/{}", self.model);
        self
    }

    /// Use a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerationProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = GenerateContentRequest {
            contents: vec![UserContent { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let response = self
            .client
            .post(format!("{}/{}:generateContent", self.base_url, self.model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "generate request failed");
                RagError::generation(PROVIDER, ProviderFailure::Transport, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %detail, "generate API error");
            return Err(RagError::generation(PROVIDER, ProviderFailure::Rejected, detail));
        }

        let generated: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse generate response");
            RagError::generation(
                PROVIDER,
                ProviderFailure::MalformedResponse,
                format!("failed to parse response: {e}"),
            )
        })?;

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RagError::generation(
                PROVIDER,
                ProviderFailure::MalformedResponse,
                "API returned no candidate text",
            ));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_are_qualified() {
        assert_eq!(qualify_model("embedding-001"), "models/embedding-001");
        assert_eq!(qualify_model("models/text-embedding-004"), "models/text-embedding-004");
    }

    #[test]
    fn identity_reflects_model_and_dimensions() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap();
        assert_eq!(provider.identity().to_string(), "gemini/models/embedding-001 (768 dims)");

        let provider = provider.with_model("gemini-embedding-001");
        assert_eq!(provider.dimensions(), 3072);
    }

    #[test]
    fn embed_request_uses_camel_case_fields() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap().with_output_dimensionality(256);
        let json = serde_json::to_value(provider.request("olá", "RETRIEVAL_QUERY")).unwrap();
        assert_eq!(json["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(json["outputDimensionality"], 256);
        assert_eq!(json["content"]["parts"][0]["text"], "olá");
    }
}
