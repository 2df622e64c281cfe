//! Property tests for passage chunking.

use docqa_rag::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use docqa_rag::document::Passage;
use proptest::prelude::*;

/// Text with words, sentence ends, paragraph breaks and some multibyte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zA-Z]{1,12}",
            2 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("\n\n".to_string()),
            1 => Just("\n".to_string()),
            1 => "[áéíóúçãõ]{1,4}",
        ],
        0..300,
    )
    .prop_map(|parts| parts.concat())
}

/// `(chunk_size, chunk_overlap)` with `chunk_overlap < chunk_size`.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

/// Rebuild the original text by dropping the shared prefix of every passage after the first.
fn reassemble(passages: &[Passage], overlap: usize) -> String {
    let mut text = String::new();
    for (i, passage) in passages.iter().enumerate() {
        if i == 0 {
            text.push_str(&passage.text);
        } else {
            text.extend(passage.text.chars().skip(overlap));
        }
    }
    text
}

fn check_contract(text: &str, passages: &[Passage], size: usize, overlap: usize) {
    if text.trim().is_empty() {
        assert!(passages.is_empty());
        return;
    }

    assert_eq!(reassemble(passages, overlap), text, "passages must cover the text without gaps");

    for (i, passage) in passages.iter().enumerate() {
        assert_eq!(passage.index, i);
        assert!(passage.char_len() <= size);
        let expected: String = text.chars().skip(passage.source_offset).take(passage.char_len()).collect();
        assert_eq!(passage.text, expected);
    }

    for pair in passages.windows(2) {
        assert_eq!(pair[1].source_offset, pair[0].source_offset + pair[0].char_len() - overlap);
    }
}

/// Every character appears in a passage, no passage exceeds `chunk_size`, and
/// consecutive passages share exactly `chunk_overlap` characters.
mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn recursive_chunker_covers_text_with_exact_overlap(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let passages = RecursiveChunker::new(size, overlap).chunk(&text);
            check_contract(&text, &passages, size, overlap);
        }

        #[test]
        fn fixed_size_chunker_covers_text_with_exact_overlap(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let passages = FixedSizeChunker::new(size, overlap).chunk(&text);
            check_contract(&text, &passages, size, overlap);

            // Every passage but the last is exactly `size` characters long.
            if let Some((_, init)) = passages.split_last() {
                prop_assert!(init.iter().all(|p| p.char_len() == size));
            }
        }
    }
}

/// Chunking the same text twice yields identical passages.
mod prop_chunk_determinism {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn chunking_is_deterministic(text in arb_text(), (size, overlap) in arb_params()) {
            let chunker = RecursiveChunker::new(size, overlap);
            prop_assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
        }
    }
}

#[test]
fn default_parameters_share_150_characters() {
    let paragraph = "A receita da empresa foi de R$ 722.875.391,46 em 2024. \
                     O lucro líquido cresceu em relação ao ano anterior.\n\n";
    let text = paragraph.repeat(60);

    let passages = RecursiveChunker::default().chunk(&text);
    assert!(passages.len() > 3);
    check_contract(&text, &passages, 1000, 150);
}
