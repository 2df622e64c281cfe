//! End-to-end tests for the indexing and query pipelines using offline providers.

use std::sync::Arc;

use docqa_rag::mock::{FailingEmbeddingProvider, HashEmbeddingProvider, MockGenerationProvider};
use docqa_rag::{
    Document, EmbeddingProvider, IndexingPipeline, InMemoryVectorIndex, ProviderFailure,
    QueryPipeline, REFUSAL_SENTINEL, RagConfig, RagError, Retriever, VectorIndex,
};

const REVENUE: &str = "A receita da empresa foi de R$ 722.875.391,46 em 2024.";

fn financial_report() -> Document {
    let filler = "O conselho de administração aprovou as demonstrações contábeis do exercício. \
                  Os auditores independentes emitiram parecer sem ressalvas.\n\n";
    let pages = vec![
        filler.repeat(8),
        format!("{}{REVENUE} O faturamento bruto cresceu no período.\n\n{}", filler.repeat(3), filler.repeat(3)),
        filler.repeat(6),
    ];
    Document::new("relatorio", pages).with_source_uri("relatorio.pdf")
}

fn config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(300)
        .chunk_overlap(50)
        .top_k(10)
        .embed_batch_size(4)
        .embed_concurrency(3)
        .build()
        .unwrap()
}

fn indexing(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
) -> IndexingPipeline {
    IndexingPipeline::builder()
        .config(config())
        .embedding_provider(embedder)
        .index(index)
        .build()
        .unwrap()
}

/// Answers from the context when it contains the revenue figure, refuses otherwise.
fn grounded_llm() -> Arc<MockGenerationProvider> {
    Arc::new(MockGenerationProvider::new(|prompt| {
        let context = prompt.split("REGRAS:").next().unwrap_or_default();
        let question = prompt.split("PERGUNTA DO USUÁRIO:").nth(1).unwrap_or_default();
        if context.contains("722.875.391,46") && question.contains("faturamento") {
            "O faturamento foi de R$ 722.875.391,46 em 2024.".to_string()
        } else {
            REFUSAL_SENTINEL.to_string()
        }
    }))
}

fn query(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<MockGenerationProvider>,
) -> QueryPipeline {
    QueryPipeline::builder()
        .embedding_provider(embedder)
        .index(index)
        .generation_provider(llm)
        .collection("docs")
        .top_k(3)
        .build()
        .unwrap()
}

#[tokio::test]
async fn answers_from_ingested_context() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(512));
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    let llm = grounded_llm();

    let stored = indexing(embedder.clone(), index.clone())
        .index_document(&financial_report(), "docs")
        .await
        .unwrap();
    assert!(stored > 5);

    let pipeline = query(embedder, index, llm.clone());
    let answer = pipeline.ask("Qual o faturamento da receita da empresa?").await.unwrap();

    assert!(!answer.is_refusal());
    assert!(answer.text.contains("722.875.391,46"));
    assert_eq!(answer.passages_used, 3);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(REVENUE), "retrieved context must carry the sentence verbatim");
}

#[tokio::test]
async fn unrelated_question_is_refused() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(512));
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());

    indexing(embedder.clone(), index.clone()).index_document(&financial_report(), "docs").await.unwrap();

    let pipeline = query(embedder, index, grounded_llm());
    let answer = pipeline.ask("Qual é a capital da França?").await.unwrap();

    assert_eq!(answer.text, REFUSAL_SENTINEL);
    assert!(answer.is_refusal());
}

#[tokio::test]
async fn empty_document_creates_empty_collection() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(64));
    let index = Arc::new(InMemoryVectorIndex::new());

    let stored = indexing(embedder.clone(), index.clone())
        .index_document(&Document::new("vazio", vec![String::new()]), "docs")
        .await
        .unwrap();
    assert_eq!(stored, 0);
    assert_eq!(index.collection_len("docs").await, Some(0));

    let result = Retriever::new(embedder, index).retrieve("qualquer coisa", "docs", 10).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn reingestion_leaves_no_residue() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(256));
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    let pipeline = indexing(embedder.clone(), index.clone());

    pipeline.index_document(&financial_report(), "docs").await.unwrap();
    let second = Document::from_text("manual", "Manual de instalação do equipamento.");
    pipeline.index_document(&second, "docs").await.unwrap();

    let result = Retriever::new(embedder, index).retrieve("receita da empresa", "docs", 10).await.unwrap();
    let texts: Vec<&str> = result.texts().collect();
    assert_eq!(texts, vec!["Manual de instalação do equipamento."]);
}

#[tokio::test]
async fn stored_records_carry_metadata() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(256));
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());

    indexing(embedder.clone(), index.clone()).index_document(&financial_report(), "docs").await.unwrap();

    let result = Retriever::new(embedder, index).retrieve(REVENUE, "docs", 1).await.unwrap();
    let top = &result.passages()[0];
    assert!(top.text.contains("722.875.391,46"));
    assert_eq!(top.metadata.get("page").map(String::as_str), Some("2"));
    assert_eq!(top.metadata.get("source").map(String::as_str), Some("relatorio.pdf"));
    assert!(top.metadata.contains_key("chunk_index"));
    assert!(top.metadata.contains_key("source_offset"));
}

#[tokio::test]
async fn never_ingested_collection_is_index_not_found() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(64));
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());

    let err = query(embedder, index, grounded_llm()).ask("Qual o faturamento?").await.unwrap_err();
    assert!(matches!(err, RagError::IndexNotFound { .. }));
    assert!(err.user_message().starts_with("index not found"));
}

#[tokio::test]
async fn embedding_failure_leaves_previous_collection_intact() {
    let good: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(64));
    let index = Arc::new(InMemoryVectorIndex::new());
    let original = indexing(good, index.clone()).index_document(&financial_report(), "docs").await.unwrap();

    // Some batches succeed before one fails; nothing may be written.
    let failing = Arc::new(FailingEmbeddingProvider::new(64, ProviderFailure::Rejected).succeeding_first(2));
    let err = indexing(failing.clone(), index.clone())
        .index_document(&Document::from_text("novo", "texto novo ".repeat(200)), "docs")
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::Embedding { kind: ProviderFailure::Rejected, .. }));
    assert!(failing.calls() >= 3);
    assert_eq!(index.collection_len("docs").await, Some(original));
}

#[tokio::test]
async fn switching_embedding_model_is_rejected_at_query_time() {
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    let ingest_model: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(64));
    indexing(ingest_model, index.clone()).index_document(&financial_report(), "docs").await.unwrap();

    let other_model: Arc<dyn EmbeddingProvider> =
        Arc::new(HashEmbeddingProvider::new(64).with_model_name("mock/other-model"));
    let llm = grounded_llm();
    let err = query(other_model, index, llm.clone()).ask("Qual o faturamento?").await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingSpaceMismatch { .. }));
    assert!(llm.prompts().is_empty(), "generation must not run after a failed stage");
}

#[tokio::test]
async fn generation_failure_is_an_error_not_a_refusal() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(64));
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    indexing(embedder.clone(), index.clone()).index_document(&financial_report(), "docs").await.unwrap();

    let llm = Arc::new(MockGenerationProvider::failing(ProviderFailure::Transport));
    let err = query(embedder, index, llm).ask("Qual o faturamento?").await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.user_message(), "could not reach the generation service");
}

#[tokio::test]
async fn blank_question_and_zero_k_are_invalid() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(64));
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());

    let err = Retriever::new(embedder.clone(), index.clone()).retrieve("q", "docs", 0).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));

    let err = query(embedder, index, grounded_llm()).ask("   ").await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));
}

#[tokio::test]
async fn build_index_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relatorio.txt");
    std::fs::write(&path, format!("Capa do relatório\x0c{REVENUE}")).unwrap();

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(64));
    let index = Arc::new(InMemoryVectorIndex::new());
    let stored = indexing(embedder, index.clone()).build_index(&path, "docs").await.unwrap();

    assert_eq!(stored, 1);
    assert_eq!(index.collection_len("docs").await, Some(1));

    let missing = dir.path().join("ausente.txt");
    let err = indexing(Arc::new(HashEmbeddingProvider::new(64)), index.clone())
        .build_index(&missing, "docs")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Load { .. }));
    assert_eq!(index.collection_len("docs").await, Some(1));
}
