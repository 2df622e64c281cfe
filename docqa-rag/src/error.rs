//! Error types for the `docqa-rag` crate.

use std::fmt;

use thiserror::Error;

/// How a call to an external provider (embedding or generation) failed.
///
/// Callers use this to tell a rejected request (quota, auth, bad input) apart
/// from a transport failure when deciding whether a retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    /// The service answered with a non-success status.
    Rejected,
    /// The request never completed (DNS, TLS, connection reset, timeout).
    Transport,
    /// The service answered successfully but the body was unusable.
    MalformedResponse,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => f.write_str("request rejected"),
            Self::Transport => f.write_str("transport failure"),
            Self::MalformedResponse => f.write_str("malformed response"),
        }
    }
}

/// Errors that can occur while indexing a document or answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// The source document could not be read or is not a supported format.
    #[error("Load error ({source_path}): {message}")]
    Load {
        /// Path or URI of the document that failed to load.
        source_path: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding provider failed.
    #[error("Embedding error ({provider}, {kind}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// Whether the request was rejected or never arrived.
        kind: ProviderFailure,
        /// A description of the failure.
        message: String,
    },

    /// The generation provider failed.
    #[error("Generation error ({provider}, {kind}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// Whether the request was rejected or never arrived.
        kind: ProviderFailure,
        /// A description of the failure.
        message: String,
    },

    /// A query named a collection that was never ingested.
    #[error("Collection '{collection}' not found")]
    IndexNotFound {
        /// The missing collection name.
        collection: String,
    },

    /// The vector index could not be reached.
    #[error("Index unavailable ({backend}): {message}")]
    IndexUnavailable {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index rejected a collection replacement.
    #[error("Index write error ({backend}): {message}")]
    IndexWrite {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index failed while answering a query.
    #[error("Index read error ({backend}): {message}")]
    IndexRead {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding space used for a query differs from the one the collection was built with.
    #[error("Collection '{collection}' was indexed with {expected}, but the query uses {actual}")]
    EmbeddingSpaceMismatch {
        /// The collection being queried.
        collection: String,
        /// The identity recorded at ingestion time.
        expected: String,
        /// The identity of the provider used for the query.
        actual: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller passed an invalid argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RagError {
    pub(crate) fn embedding(
        provider: impl Into<String>,
        kind: ProviderFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::Embedding { provider: provider.into(), kind, message: message.into() }
    }

    pub(crate) fn generation(
        provider: impl Into<String>,
        kind: ProviderFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::Generation { provider: provider.into(), kind, message: message.into() }
    }

    /// Returns `true` when retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Embedding { kind: ProviderFailure::Transport, .. }
                | Self::Generation { kind: ProviderFailure::Transport, .. }
        )
    }

    /// A short operator-facing description of the failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Load { source_path, .. } => {
                format!("could not read the document '{source_path}'")
            }
            Self::Embedding { kind: ProviderFailure::Transport, .. } => {
                "could not reach the embedding service".to_string()
            }
            Self::Embedding { .. } => "the embedding service rejected the request".to_string(),
            Self::Generation { kind: ProviderFailure::Transport, .. } => {
                "could not reach the generation service".to_string()
            }
            Self::Generation { .. } => "the generation service rejected the request".to_string(),
            Self::IndexNotFound { collection } => {
                format!("index not found — run ingestion first (collection '{collection}')")
            }
            Self::IndexUnavailable { .. } => "could not reach the vector index".to_string(),
            Self::IndexWrite { .. } => "the vector index rejected the ingestion".to_string(),
            Self::IndexRead { .. } => "the vector index could not be queried".to_string(),
            Self::EmbeddingSpaceMismatch { collection, .. } => format!(
                "collection '{collection}' was built with a different embedding model; re-run ingestion"
            ),
            Self::Config(message) => format!("configuration error: {message}"),
            Self::InvalidInput(message) => format!("invalid input: {message}"),
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_transient() {
        let transport = RagError::embedding("OpenAI", ProviderFailure::Transport, "reset");
        let rejected = RagError::generation("OpenAI", ProviderFailure::Rejected, "429");
        let missing = RagError::IndexNotFound { collection: "docs".into() };

        assert!(transport.is_transient());
        assert!(!rejected.is_transient());
        assert!(!missing.is_transient());
    }

    #[test]
    fn user_messages_distinguish_missing_index_from_unreachable_service() {
        let missing = RagError::IndexNotFound { collection: "docs".into() };
        assert!(missing.user_message().starts_with("index not found — run ingestion first"));

        let unreachable = RagError::embedding("Gemini", ProviderFailure::Transport, "dns");
        assert_eq!(unreachable.user_message(), "could not reach the embedding service");
    }
}
