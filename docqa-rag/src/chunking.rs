//! Passage chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`]: cuts at paragraph, then sentence, then word boundaries
//! - [`FixedSizeChunker`]: cuts at a fixed character count
//!
//! Both work in characters, not bytes, and both guarantee the same coverage
//! contract: passages cover the whole input in order with no gaps, every
//! passage is at most `chunk_size` characters long, and consecutive passages
//! share exactly `chunk_overlap` characters.

use crate::document::Passage;

/// A strategy for splitting document text into passages.
pub trait Chunker: Send + Sync {
    /// Split text into passages.
    ///
    /// Returns an empty `Vec` if the text is empty or whitespace only.
    /// The same input always yields the same passages.
    fn chunk(&self, text: &str) -> Vec<Passage>;
}

/// Splits text into overlapping passages, preferring natural boundaries.
///
/// Each passage ends at the last paragraph break (`\n\n`) inside its window;
/// failing that at the last sentence end (`. `, `! `, `? ` or a line break);
/// failing that after the last whitespace; and only then with a hard cut at
/// `chunk_size` characters. Paragraph and sentence breaks in the first half of
/// the window are ignored so that one short paragraph does not produce a run
/// of tiny passages.
///
/// The next passage always starts exactly `chunk_overlap` characters before the
/// previous one ended.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 150);
/// let passages = chunker.chunk(&document.text());
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per passage
    /// * `chunk_overlap`: number of characters shared by consecutive passages
    ///
    /// `chunk_overlap` is clamped to `chunk_size - 1` so chunking always makes progress.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CHUNK_SIZE, crate::config::DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<Passage> {
        chunk_with(text, self.chunk_size, self.chunk_overlap, true)
    }
}

/// Splits text into fixed-size passages by character count with overlap.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50);
/// let passages = chunker.chunk(&text);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// `chunk_overlap` is clamped to `chunk_size - 1`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str) -> Vec<Passage> {
        chunk_with(text, self.chunk_size, self.chunk_overlap, false)
    }
}

fn chunk_with(text: &str, chunk_size: usize, chunk_overlap: usize, natural: bool) -> Vec<Passage> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    // Byte offset of every char boundary, including the end of the string.
    let byte_offsets: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();

    split_ranges(&chars, chunk_size, chunk_overlap, natural)
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| Passage {
            index,
            text: text[byte_offsets[start]..byte_offsets[end]].to_string(),
            source_offset: start,
        })
        .collect()
}

/// Compute `[start, end)` character ranges for each passage.
fn split_ranges(
    chars: &[char],
    chunk_size: usize,
    chunk_overlap: usize,
    natural: bool,
) -> Vec<(usize, usize)> {
    let total = chars.len();
    let mut ranges = Vec::new();
    let mut start = 0;

    loop {
        if total - start <= chunk_size {
            ranges.push((start, total));
            break;
        }

        let hard_end = start + chunk_size;
        // The passage must extend past the overlap, otherwise the next one would not advance.
        let min_end = start + chunk_overlap + 1;
        let end = if natural { find_boundary(chars, start, min_end, hard_end) } else { hard_end };

        ranges.push((start, end));
        start = end - chunk_overlap;
    }

    ranges
}

/// Pick the best cut position in `[min_end, hard_end]`.
fn find_boundary(chars: &[char], start: usize, min_end: usize, hard_end: usize) -> usize {
    let structural_floor = min_end.max(start + (hard_end - start) / 2);

    last_match(chars, structural_floor, hard_end, ends_paragraph)
        .or_else(|| last_match(chars, structural_floor, hard_end, ends_sentence))
        .or_else(|| last_match(chars, min_end, hard_end, ends_word))
        .unwrap_or(hard_end)
}

fn last_match(
    chars: &[char],
    floor: usize,
    ceiling: usize,
    is_boundary: fn(&[char], usize) -> bool,
) -> Option<usize> {
    if floor > ceiling {
        return None;
    }
    (floor..=ceiling).rev().find(|&end| is_boundary(chars, end))
}

fn ends_paragraph(chars: &[char], end: usize) -> bool {
    end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n'
}

fn ends_sentence(chars: &[char], end: usize) -> bool {
    if end >= 1 && chars[end - 1] == '\n' {
        return true;
    }
    end >= 2 && matches!(chars[end - 2], '.' | '!' | '?') && chars[end - 1].is_whitespace()
}

fn ends_word(chars: &[char], end: usize) -> bool {
    end >= 1 && chars[end - 1].is_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn empty_and_blank_text_yield_no_passages() {
        let chunker = RecursiveChunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn short_text_is_a_single_passage() {
        let chunker = RecursiveChunker::new(100, 20);
        let passages = chunker.chunk("A receita da empresa foi de R$ 722.875.391,46 em 2024.");
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].source_offset, 0);
        assert_eq!(passages[0].index, 0);
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let first = "a".repeat(30);
        let second = "b".repeat(30);
        let text = format!("{first}\n\n{second}");
        let chunker = RecursiveChunker::new(40, 0);
        let passages = chunker.chunk(&text);
        assert_eq!(texts(&passages), vec![format!("{first}\n\n").as_str(), second.as_str()]);
    }

    #[test]
    fn falls_back_to_sentence_then_word_boundaries() {
        let text = "Primeira frase aqui. Segunda frase logo depois. Terceira";
        let chunker = RecursiveChunker::new(30, 0);
        let passages = chunker.chunk(text);
        assert_eq!(passages[0].text, "Primeira frase aqui. ");

        let words = "alpha beta gamma delta epsilon zeta";
        let passages = RecursiveChunker::new(12, 0).chunk(words);
        assert!(passages.iter().all(|p| p.char_len() <= 12));
        assert_eq!(passages[0].text, "alpha beta ");
    }

    #[test]
    fn hard_cuts_unbroken_text() {
        let text = "x".repeat(25);
        let passages = RecursiveChunker::new(10, 3).chunk(&text);
        let lens: Vec<usize> = passages.iter().map(Passage::char_len).collect();
        assert_eq!(lens, vec![10, 10, 10, 4]);
        assert_eq!(passages[1].source_offset, 7);
    }

    #[test]
    fn consecutive_passages_share_exact_overlap() {
        let text = "Lorem ipsum dolor sit amet. ".repeat(200);
        let passages = RecursiveChunker::new(1000, 150).chunk(&text);
        assert!(passages.len() > 2);
        for pair in passages.windows(2) {
            let tail: String = {
                let chars: Vec<char> = pair[0].text.chars().collect();
                chars[chars.len() - 150..].iter().collect()
            };
            let head: String = pair[1].text.chars().take(150).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "ação é çá ".repeat(50);
        let passages = FixedSizeChunker::new(7, 2).chunk(&text);
        assert!(passages.iter().all(|p| p.char_len() <= 7));
        assert_eq!(passages[1].source_offset, 5);
    }

    #[test]
    fn overlap_is_clamped_below_chunk_size() {
        let passages = FixedSizeChunker::new(4, 10).chunk("abcdefgh");
        // overlap clamps to 3, so each passage advances by one character
        assert_eq!(passages.len(), 5);
    }
}
