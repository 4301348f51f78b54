//! End-to-end behavior tests for the semantic index.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use kb_index::{
    Document, EmbeddingProvider, IndexConfig, IndexError, JsonFileSource, KnowledgeSource,
    SemanticIndex,
};

/// Embedding provider that serves canned vectors keyed by input text and
/// counts every call, so tests can assert how often the network would have
/// been hit.
struct CannedProvider {
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl CannedProvider {
    fn new(entries: &[(&str, &[f32])]) -> Arc<Self> {
        let vectors =
            entries.iter().map(|(text, v)| (text.to_string(), v.to_vec())).collect();
        Arc::new(Self { vectors, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CannedProvider {
    async fn embed(&self, text: &str) -> kb_index::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors.get(text).cloned().ok_or_else(|| IndexError::Provider {
            provider: "canned".into(),
            message: format!("no canned vector for '{text}'"),
        })
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Knowledge source backed by an in-memory list.
struct FixtureSource(Vec<Document>);

#[async_trait]
impl KnowledgeSource for FixtureSource {
    async fn load(&self) -> kb_index::Result<Vec<Document>> {
        Ok(self.0.clone())
    }
}

fn doc(id: &str, text: &str) -> Document {
    Document { id: id.into(), text: text.into() }
}

/// Three documents with axis-aligned embeddings and a query aligned with "a".
fn ranking_fixture() -> (Arc<CannedProvider>, SemanticIndex) {
    let provider = CannedProvider::new(&[
        ("x", &[1.0, 0.0]),
        ("y", &[0.0, 1.0]),
        ("z", &[0.5, 0.5]),
        ("the query", &[1.0, 0.0]),
    ]);
    let index = SemanticIndex::builder()
        .source(Arc::new(FixtureSource(vec![doc("a", "x"), doc("b", "y"), doc("c", "z")])))
        .provider(provider.clone())
        .build()
        .unwrap();
    (provider, index)
}

#[tokio::test]
async fn query_ranks_by_descending_similarity() {
    let (_, index) = ranking_fixture();

    let results = index.query("the query", 2).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "a");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[0].text, "x");
    assert_eq!(results[1].id, "c");
    assert!((results[1].score - 0.707_106_78).abs() < 1e-6);
    assert_eq!(results[1].text, "z");
}

#[tokio::test]
async fn result_count_is_min_of_top_k_and_document_count() {
    let (_, index) = ranking_fixture();

    assert_eq!(index.query("the query", 1).await.unwrap().len(), 1);
    assert_eq!(index.query("the query", 3).await.unwrap().len(), 3);
    assert_eq!(index.query("the query", 50).await.unwrap().len(), 3);
}

#[tokio::test]
async fn build_is_idempotent_and_skips_the_provider_when_cached() {
    let (provider, index) = ranking_fixture();

    let first = index.build().await.unwrap();
    assert_eq!(provider.calls(), 3);

    let second = index.build().await.unwrap();
    assert_eq!(provider.calls(), 3);
    assert_eq!(*first, *second);
}

#[tokio::test]
async fn query_only_embeds_the_query_once_the_cache_is_warm() {
    let (provider, index) = ranking_fixture();

    index.query("the query", 2).await.unwrap();
    assert_eq!(provider.calls(), 4);

    index.query("the query", 2).await.unwrap();
    assert_eq!(provider.calls(), 5);
}

#[tokio::test]
async fn concurrent_cold_builds_populate_the_cache_exactly_once() {
    let (provider, index) = ranking_fixture();

    let (first, second) = tokio::join!(index.build(), index.build());

    assert_eq!(*first.unwrap(), *second.unwrap());
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn reset_forces_a_full_rebuild() {
    let (provider, index) = ranking_fixture();

    index.build().await.unwrap();
    index.reset().await;
    index.build().await.unwrap();

    assert_eq!(provider.calls(), 6);
}

#[tokio::test]
async fn top_k_zero_is_rejected() {
    let (provider, index) = ranking_fixture();

    let err = index.query("the query", 0).await.unwrap_err();

    assert!(matches!(err, IndexError::InvalidArgument(_)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn empty_knowledge_base_is_rejected_on_query() {
    let provider = CannedProvider::new(&[]);
    let index = SemanticIndex::builder()
        .source(Arc::new(FixtureSource(Vec::new())))
        .provider(provider.clone())
        .build()
        .unwrap();

    let err = index.query("anything", 3).await.unwrap_err();

    assert!(matches!(err, IndexError::EmptyIndex));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn degenerate_query_embedding_fails_the_query() {
    let provider =
        CannedProvider::new(&[("x", &[1.0, 0.0]), ("the query", &[0.0, 0.0])]);
    let index = SemanticIndex::builder()
        .source(Arc::new(FixtureSource(vec![doc("a", "x")])))
        .provider(provider)
        .build()
        .unwrap();

    let err = index.query("the query", 1).await.unwrap_err();

    assert!(matches!(err, IndexError::DegenerateVector(_)));
}

#[tokio::test]
async fn degenerate_document_embedding_is_excluded_not_fatal() {
    let provider = CannedProvider::new(&[
        ("x", &[1.0, 0.0]),
        ("broken", &[0.0, 0.0]),
        ("the query", &[1.0, 0.0]),
    ]);
    let index = SemanticIndex::builder()
        .source(Arc::new(FixtureSource(vec![doc("a", "x"), doc("b", "broken")])))
        .provider(provider)
        .build()
        .unwrap();

    let results = index.query("the query", 5).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a");
}

#[tokio::test]
async fn equal_scores_keep_source_order() {
    let provider = CannedProvider::new(&[
        ("same one", &[2.0, 0.0]),
        ("same two", &[4.0, 0.0]),
        ("the query", &[1.0, 0.0]),
    ]);
    let index = SemanticIndex::builder()
        .source(Arc::new(FixtureSource(vec![
            doc("first", "same one"),
            doc("second", "same two"),
        ])))
        .provider(provider)
        .build()
        .unwrap();

    let results = index.query("the query", 2).await.unwrap();

    assert!((results[0].score - results[1].score).abs() < 1e-6);
    assert_eq!(results[0].id, "first");
    assert_eq!(results[1].id, "second");
}

#[tokio::test]
async fn result_text_is_whitespace_trimmed() {
    let provider =
        CannedProvider::new(&[("  padded content \n", &[1.0, 0.0]), ("the query", &[1.0, 0.0])]);
    let index = SemanticIndex::builder()
        .source(Arc::new(FixtureSource(vec![doc("a", "  padded content \n")])))
        .provider(provider)
        .build()
        .unwrap();

    let results = index.query("the query", 1).await.unwrap();

    assert_eq!(results[0].text, "padded content");
}

#[tokio::test]
async fn provider_failures_propagate_to_the_caller() {
    let provider = CannedProvider::new(&[("x", &[1.0, 0.0])]);
    let index = SemanticIndex::builder()
        .source(Arc::new(FixtureSource(vec![doc("a", "x")])))
        .provider(provider)
        .build()
        .unwrap();

    let err = index.query("text with no canned vector", 1).await.unwrap_err();

    assert!(matches!(err, IndexError::Provider { .. }));
}

#[tokio::test]
async fn query_default_uses_the_configured_top_k() {
    let provider = CannedProvider::new(&[
        ("x", &[1.0, 0.0]),
        ("y", &[0.0, 1.0]),
        ("z", &[0.5, 0.5]),
        ("the query", &[1.0, 0.0]),
    ]);
    let index = SemanticIndex::builder()
        .config(IndexConfig::builder().default_top_k(2).build().unwrap())
        .source(Arc::new(FixtureSource(vec![doc("a", "x"), doc("b", "y"), doc("c", "z")])))
        .provider(provider)
        .build()
        .unwrap();

    assert_eq!(index.query_default("the query").await.unwrap().len(), 2);
}

#[test]
fn config_builder_rejects_zero_top_k() {
    let err = IndexConfig::builder().default_top_k(0).build().unwrap_err();
    assert!(matches!(err, IndexError::InvalidArgument(_)));
}

#[test]
fn index_builder_requires_source_and_provider() {
    let err = SemanticIndex::builder().build().unwrap_err();
    assert!(matches!(err, IndexError::InvalidArgument(_)));
}

// ── JSON file source ───────────────────────────────────────────────

#[tokio::test]
async fn json_file_source_loads_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(&path, r#"{"z-last": "omega", "a-first": "alpha"}"#).unwrap();

    let docs = JsonFileSource::new(&path).load().await.unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0], doc("z-last", "omega"));
    assert_eq!(docs[1], doc("a-first", "alpha"));
}

#[tokio::test]
async fn missing_file_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let source = JsonFileSource::new(dir.path().join("missing.json"));

    let err = source.load().await.unwrap_err();

    assert!(matches!(err, IndexError::SourceUnavailable { .. }));
}

#[tokio::test]
async fn array_instead_of_object_is_malformed_not_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(&path, r#"[{"url": "https://example.com", "content": "text"}]"#).unwrap();

    let err = JsonFileSource::new(&path).load().await.unwrap_err();

    assert!(matches!(err, IndexError::MalformedSource(_)));
}

#[tokio::test]
async fn non_string_value_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(&path, r#"{"https://example.com": 42}"#).unwrap();

    let err = JsonFileSource::new(&path).load().await.unwrap_err();

    assert!(matches!(err, IndexError::MalformedSource(_)));
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(&path, "not json at all").unwrap();

    let err = JsonFileSource::new(&path).load().await.unwrap_err();

    assert!(matches!(err, IndexError::MalformedSource(_)));
}

#[tokio::test]
async fn index_reads_documents_through_the_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(&path, r#"{"https://example.com/a": "x", "https://example.com/b": "y"}"#)
        .unwrap();

    let provider = CannedProvider::new(&[
        ("x", &[1.0, 0.0]),
        ("y", &[0.0, 1.0]),
        ("the query", &[0.9, 0.1]),
    ]);
    let index = SemanticIndex::builder()
        .source(Arc::new(JsonFileSource::new(&path)))
        .provider(provider)
        .build()
        .unwrap();

    let results = index.query("the query", 1).await.unwrap();

    assert_eq!(results[0].id, "https://example.com/a");
}
