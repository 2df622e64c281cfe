//! Data types for documents, passages, stored records and retrieval results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator placed between pages when a [`Document`] is flattened to text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// A source document: an ordered sequence of page texts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier for the document, used to derive record IDs.
    pub id: String,
    /// Page texts in reading order.
    pub pages: Vec<String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document from page texts.
    pub fn new(id: impl Into<String>, pages: Vec<String>) -> Self {
        Self { id: id.into(), pages, source_uri: None }
    }

    /// Create a single-page document.
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, vec![text.into()])
    }

    /// Attach the URI of the original source.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }

    /// The concatenated document text, pages joined by [`PAGE_SEPARATOR`].
    pub fn text(&self) -> String {
        self.pages.join(PAGE_SEPARATOR)
    }

    /// Returns `true` if the document holds no text other than whitespace.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.trim().is_empty())
    }

    /// Map a character offset in [`text()`](Self::text) to its 1-based page number.
    ///
    /// Offsets that fall on a page separator belong to the preceding page.
    /// Offsets past the end map to the last page.
    pub fn page_at(&self, char_offset: usize) -> usize {
        let separator_len = PAGE_SEPARATOR.chars().count();
        let mut page_end = 0;
        for (i, page) in self.pages.iter().enumerate() {
            page_end += page.chars().count();
            if char_offset < page_end + separator_len {
                return i + 1;
            }
            page_end += separator_len;
        }
        self.pages.len().max(1)
    }
}

/// A contiguous slice of document text produced by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passage {
    /// Position of the passage in the chunked sequence.
    pub index: usize,
    /// The passage text.
    pub text: String,
    /// Character offset of the passage start within the concatenated document text.
    pub source_offset: usize,
}

impl Passage {
    /// Length of the passage in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A passage paired with its embedding, as stored in a vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassageRecord {
    /// Unique identifier of the record within its collection.
    pub id: String,
    /// The passage text.
    pub text: String,
    /// The vector embedding for this passage's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata (`chunk_index`, `page`, `source_offset`, `source`).
    pub metadata: HashMap<String, String>,
}

/// The embedding space a collection was built in.
///
/// Ingestion records it with the collection; retrieval refuses to query a
/// collection with an embedding provider whose identity differs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct IndexIdentity {
    /// Provider-qualified embedding model name, e.g. `openai/text-embedding-3-small`.
    pub embedding_model: String,
    /// Dimensionality of every vector in the collection.
    pub dimensions: usize,
}

impl IndexIdentity {
    /// Create a new identity.
    pub fn new(embedding_model: impl Into<String>, dimensions: usize) -> Self {
        Self { embedding_model: embedding_model.into(), dimensions }
    }
}

impl fmt::Display for IndexIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} dims)", self.embedding_model, self.dimensions)
    }
}

/// A retrieved passage paired with a similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPassage {
    /// The passage text.
    pub text: String,
    /// The similarity score (higher is more relevant).
    pub score: f32,
    /// Metadata stored with the passage.
    pub metadata: HashMap<String, String>,
}

/// Passages retrieved for one question, ordered by descending similarity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    passages: Vec<ScoredPassage>,
}

impl RetrievalResult {
    /// Build a result from passages, sorting them by descending score.
    pub fn new(mut passages: Vec<ScoredPassage>) -> Self {
        passages.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { passages }
    }

    /// The retrieved passages, most similar first.
    pub fn passages(&self) -> &[ScoredPassage] {
        &self.passages
    }

    /// Number of retrieved passages.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Returns `true` if nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Iterate over passage texts in retrieval order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.passages.iter().map(|p| p.text.as_str())
    }

    /// Consume the result, returning the passages.
    pub fn into_passages(self) -> Vec<ScoredPassage> {
        self.passages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(text: &str, score: f32) -> ScoredPassage {
        ScoredPassage { text: text.to_string(), score, metadata: HashMap::new() }
    }

    #[test]
    fn page_at_maps_offsets_to_pages() {
        let doc = Document::new("d", vec!["abc".into(), "de".into(), "f".into()]);
        // text = "abc\n\nde\n\nf"
        assert_eq!(doc.text(), "abc\n\nde\n\nf");
        assert_eq!(doc.page_at(0), 1);
        assert_eq!(doc.page_at(2), 1);
        assert_eq!(doc.page_at(4), 1);
        assert_eq!(doc.page_at(5), 2);
        assert_eq!(doc.page_at(9), 3);
        assert_eq!(doc.page_at(100), 3);
    }

    #[test]
    fn page_at_counts_characters_not_bytes() {
        let doc = Document::new("d", vec!["ação".into(), "fim".into()]);
        assert_eq!(doc.page_at(3), 1);
        assert_eq!(doc.page_at(6), 2);
    }

    #[test]
    fn blank_documents_are_detected() {
        assert!(Document::new("d", vec![]).is_blank());
        assert!(Document::new("d", vec!["  ".into(), "\n".into()]).is_blank());
        assert!(!Document::from_text("d", "x").is_blank());
    }

    #[test]
    fn retrieval_result_sorts_by_descending_score() {
        let result = RetrievalResult::new(vec![scored("a", 0.1), scored("b", 0.9), scored("c", 0.5)]);
        let texts: Vec<&str> = result.texts().collect();
        assert_eq!(texts, vec!["b", "c", "a"]);
    }
}
