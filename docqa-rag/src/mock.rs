//! Deterministic providers for tests and offline demos.
//!
//! None of these call a network service. [`HashEmbeddingProvider`] produces
//! bag-of-words vectors, so texts sharing words land near each other and
//! retrieval behaves plausibly without an API key.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{ProviderFailure, RagError, Result};
use crate::generation::GenerationProvider;

const MOCK_PROVIDER: &str = "Mock";

/// Embeds text by hashing each lowercase word into one of `dimensions` buckets.
///
/// Vectors are L2-normalised; text without words maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
    model_name: String,
}

impl HashEmbeddingProvider {
    /// Create a provider producing `dimensions`-element vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1), model_name: "mock/hash-embedding".to_string() }
    }

    /// Report a different model name, e.g. to simulate switching models.
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = fnv1a(&word.to_lowercase()) % self.dimensions as u64;
            vector[bucket as usize] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// An embedding provider that fails, optionally after a number of successful calls.
///
/// Successful calls return zero vectors. Every call to `embed` or
/// `embed_batch` counts as one call.
#[derive(Debug)]
pub struct FailingEmbeddingProvider {
    dimensions: usize,
    kind: ProviderFailure,
    succeed_first: usize,
    calls: AtomicUsize,
}

impl FailingEmbeddingProvider {
    /// Create a provider whose every call fails with `kind`.
    pub fn new(dimensions: usize, kind: ProviderFailure) -> Self {
        Self { dimensions, kind, succeed_first: 0, calls: AtomicUsize::new(0) }
    }

    /// Let the first `calls` calls succeed before failing.
    pub fn succeeding_first(mut self, calls: usize) -> Self {
        self.succeed_first = calls;
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_call(&self) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.succeed_first {
            return Ok(());
        }
        Err(RagError::embedding(MOCK_PROVIDER, self.kind, "scripted failure"))
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.next_call()?;
        Ok(vec![0.0; self.dimensions])
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.next_call()?;
        Ok(vec![vec![0.0; self.dimensions]; texts.len()])
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "mock/failing-embedding"
    }
}

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A generation provider driven by a closure over the prompt.
///
/// Every prompt received is recorded and can be inspected with
/// [`prompts()`](Self::prompts).
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::mock::MockGenerationProvider;
///
/// let llm = MockGenerationProvider::new(|prompt| {
///     if prompt.contains("722.875.391,46") { "R$ 722.875.391,46".into() } else { REFUSAL_SENTINEL.into() }
/// });
/// ```
pub struct MockGenerationProvider {
    responder: Responder,
    failure: Option<ProviderFailure>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerationProvider {
    /// Create a provider answering each prompt with `responder(prompt)`.
    pub fn new(responder: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self { responder: Box::new(responder), failure: None, prompts: Mutex::new(Vec::new()) }
    }

    /// Create a provider that always answers `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| text.clone())
    }

    /// Create a provider whose every call fails with `kind`.
    pub fn failing(kind: ProviderFailure) -> Self {
        let mut provider = Self::fixed(String::new());
        provider.failure = Some(kind);
        provider
    }

    /// The prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(kind) = self.failure {
            return Err(RagError::generation(MOCK_PROVIDER, kind, "scripted failure"));
        }
        Ok((self.responder)(prompt))
    }

    fn model_name(&self) -> &str {
        "mock/generation"
    }
}
