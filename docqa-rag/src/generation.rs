//! Generation provider trait for producing completions from a prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that turns one prompt into one completion.
///
/// Implementations should run deterministically where the backend allows it
/// (temperature 0), since the query pipeline relies on the model honouring the
/// grounding instruction rather than on post-processing.
///
/// Failures are reported as [`RagError::Generation`](crate::RagError::Generation)
/// with a [`ProviderFailure`](crate::ProviderFailure) kind.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider-qualified model name, e.g. `openai/gpt-4o-mini`.
    fn model_name(&self) -> &str;
}
