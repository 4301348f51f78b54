//! The semantic retrieval index.
//!
//! [`SemanticIndex`] loads a document collection from a
//! [`KnowledgeSource`], lazily embeds every document through an
//! [`EmbeddingProvider`], and answers top-k queries by cosine similarity.
//! Both the document collection and the embedded index are cached on the
//! instance after the first successful computation; [`reset`](SemanticIndex::reset)
//! clears them.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kb_index::{IndexConfig, JsonFileSource, SemanticIndex};
//!
//! let index = SemanticIndex::builder()
//!     .config(IndexConfig::default())
//!     .source(Arc::new(JsonFileSource::new("data/knowledge_base.json")))
//!     .provider(Arc::new(my_provider))
//!     .build()?;
//!
//! let results = index.query("card machine fees", 3).await?;
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::document::{Document, EmbeddedDocument, QueryResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{IndexError, Result};
use crate::source::KnowledgeSource;

/// Compute the cosine similarity between two vectors: dot(a,b) / (‖a‖·‖b‖).
///
/// Magnitude-independent: 1.0 for identical direction, 0.0 for orthogonal,
/// -1.0 for opposite.
///
/// # Errors
///
/// Returns [`IndexError::DegenerateVector`] when either vector has zero
/// magnitude; the quotient is undefined in that case.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 {
        return Err(IndexError::DegenerateVector("left-hand vector has zero magnitude".into()));
    }
    if norm_b == 0.0 {
        return Err(IndexError::DegenerateVector("right-hand vector has zero magnitude".into()));
    }
    Ok(dot / (norm_a * norm_b))
}

/// A populate-once semantic retrieval index over a static knowledge base.
///
/// The index contacts the embedding provider only on a cold cache: once per
/// document on the first build, plus once per query for the query text. A
/// built index is returned unconditionally on later builds, even if the
/// underlying source has changed; callers needing freshness must call
/// [`reset`](SemanticIndex::reset). Construct one via
/// [`SemanticIndex::builder()`].
pub struct SemanticIndex {
    config: IndexConfig,
    source: Arc<dyn KnowledgeSource>,
    provider: Arc<dyn EmbeddingProvider>,
    documents: RwLock<Option<Arc<Vec<Document>>>>,
    embedded: RwLock<Option<Arc<Vec<EmbeddedDocument>>>>,
    // Lock order: build_lock before load_lock. Concurrent cold builds race
    // to populate the cache exactly once; losers observe the winner's result.
    build_lock: Mutex<()>,
    load_lock: Mutex<()>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SemanticIndex {
    /// Create a new [`SemanticIndexBuilder`].
    pub fn builder() -> SemanticIndexBuilder {
        SemanticIndexBuilder::default()
    }

    /// Return a reference to the index configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Return the document collection, loading it from the source on first call.
    ///
    /// Later calls return the cached collection without re-reading the source.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::SourceUnavailable`] or
    /// [`IndexError::MalformedSource`] when the source cannot be loaded;
    /// a failed load is not cached, so the next call retries the source.
    pub async fn documents(&self) -> Result<Arc<Vec<Document>>> {
        if let Some(docs) = self.documents.read().await.clone() {
            return Ok(docs);
        }

        let _guard = self.load_lock.lock().await;
        if let Some(docs) = self.documents.read().await.clone() {
            return Ok(docs);
        }

        let docs = Arc::new(self.source.load().await?);
        info!(count = docs.len(), "knowledge base loaded");
        *self.documents.write().await = Some(docs.clone());
        Ok(docs)
    }

    /// Embed every document and return the index, building it on first call.
    ///
    /// Later calls return the cached index without contacting the provider,
    /// even if the underlying source has since changed. Concurrent cold
    /// builds issue the provider calls exactly once.
    ///
    /// # Errors
    ///
    /// Propagates source errors from [`documents`](SemanticIndex::documents)
    /// and [`IndexError::Provider`] from the embedding calls; a failed build
    /// leaves the cache empty.
    pub async fn build(&self) -> Result<Arc<Vec<EmbeddedDocument>>> {
        if let Some(index) = self.embedded.read().await.clone() {
            return Ok(index);
        }

        let _guard = self.build_lock.lock().await;
        if let Some(index) = self.embedded.read().await.clone() {
            return Ok(index);
        }

        let documents = self.documents().await?;
        debug!(count = documents.len(), "embedding knowledge base");

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(IndexError::Provider {
                provider: "embed_batch".into(),
                message: format!(
                    "returned {} embeddings for {} documents",
                    embeddings.len(),
                    documents.len()
                ),
            });
        }

        let index: Arc<Vec<EmbeddedDocument>> = Arc::new(
            documents
                .iter()
                .zip(embeddings)
                .map(|(doc, embedding)| EmbeddedDocument {
                    id: doc.id.clone(),
                    text: doc.text.clone(),
                    embedding,
                })
                .collect(),
        );

        info!(count = index.len(), "index built");
        *self.embedded.write().await = Some(index.clone());
        Ok(index)
    }

    /// Return the `top_k` documents most similar to the query text.
    ///
    /// Builds the index if it is not cached, embeds the query, scores every
    /// document by cosine similarity, and returns the first
    /// `min(top_k, n)` results ordered by descending score. Equal scores
    /// keep the source's document order (the sort is stable). Result text
    /// is whitespace-trimmed.
    ///
    /// A document whose cached embedding has zero magnitude cannot be
    /// scored; it is excluded from the ranking with a warning rather than
    /// failing the query.
    ///
    /// # Errors
    ///
    /// - [`IndexError::InvalidArgument`] if `top_k == 0`.
    /// - [`IndexError::EmptyIndex`] if the knowledge base has no documents.
    /// - [`IndexError::DegenerateVector`] if the query embedding has zero
    ///   magnitude.
    /// - Source and provider errors propagated from the cold-cache path.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        if top_k == 0 {
            return Err(IndexError::InvalidArgument("top_k must be at least 1".into()));
        }

        let index = self.build().await?;
        if index.is_empty() {
            return Err(IndexError::EmptyIndex);
        }

        let query_embedding = self.provider.embed(text).await?;
        let query_norm: f32 = query_embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if query_norm == 0.0 {
            return Err(IndexError::DegenerateVector("query embedding has zero magnitude".into()));
        }

        debug!(text_len = text.len(), top_k, candidates = index.len(), "scoring query");

        let mut scored: Vec<QueryResult> = Vec::with_capacity(index.len());
        for doc in index.iter() {
            match cosine_similarity(&query_embedding, &doc.embedding) {
                Ok(score) => scored.push(QueryResult {
                    id: doc.id.clone(),
                    score,
                    text: doc.text.trim().to_string(),
                }),
                Err(_) => {
                    warn!(id = %doc.id, "skipping document with zero-magnitude embedding");
                }
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// [`query`](SemanticIndex::query) with the configured default `top_k`.
    pub async fn query_default(&self, text: &str) -> Result<Vec<QueryResult>> {
        self.query(text, self.config.default_top_k).await
    }

    /// Clear the document and embedding caches.
    ///
    /// The next access reloads the source and re-embeds every document.
    pub async fn reset(&self) {
        let _build = self.build_lock.lock().await;
        let _load = self.load_lock.lock().await;
        *self.embedded.write().await = None;
        *self.documents.write().await = None;
        info!("index caches cleared");
    }
}

/// Builder for constructing a [`SemanticIndex`].
#[derive(Default)]
pub struct SemanticIndexBuilder {
    config: Option<IndexConfig>,
    source: Option<Arc<dyn KnowledgeSource>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl SemanticIndexBuilder {
    /// Set the index configuration. Defaults to [`IndexConfig::default()`].
    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the knowledge source to load documents from.
    pub fn source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the embedding provider.
    pub fn provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Build the [`SemanticIndex`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] if the knowledge source or
    /// embedding provider is missing.
    pub fn build(self) -> Result<SemanticIndex> {
        let source = self
            .source
            .ok_or_else(|| IndexError::InvalidArgument("knowledge source is required".into()))?;
        let provider = self
            .provider
            .ok_or_else(|| IndexError::InvalidArgument("embedding provider is required".into()))?;

        Ok(SemanticIndex {
            config: self.config.unwrap_or_default(),
            source,
            provider,
            documents: RwLock::new(None),
            embedded: RwLock::new(None),
            build_lock: Mutex::new(()),
            load_lock: Mutex::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = [1.0, 2.0, 3.0];
        let score = cosine_similarity(&v, &v).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_negative_one() {
        let score = cosine_similarity(&[2.0, -1.0], &[-2.0, 1.0]).unwrap();
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_rejected() {
        assert!(matches!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            Err(IndexError::DegenerateVector(_))
        ));
        assert!(matches!(
            cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]),
            Err(IndexError::DegenerateVector(_))
        ));
    }
}
