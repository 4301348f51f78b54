//! In-memory semantic retrieval over a static knowledge base.
//!
//! `kb-index` loads a knowledge base (a JSON object mapping identifier to
//! text content), lazily embeds every entry through a pluggable
//! [`EmbeddingProvider`], and answers top-k queries by cosine similarity.
//! Documents and embeddings are cached per index instance after the first
//! computation; an explicit [`SemanticIndex::reset`] clears them.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kb_index::gemini::GeminiEmbeddingProvider;
//! use kb_index::{IndexConfig, JsonFileSource, SemanticIndex};
//!
//! let index = SemanticIndex::builder()
//!     .config(IndexConfig::default())
//!     .source(Arc::new(JsonFileSource::new("data/knowledge_base.json")))
//!     .provider(Arc::new(GeminiEmbeddingProvider::from_env()?))
//!     .build()?;
//!
//! let results = index.query("card machine fees", 3).await?;
//! for hit in &results {
//!     println!("{} ({:.3})", hit.id, hit.score);
//! }
//! ```
//!
//! # Features
//!
//! - `gemini` – enables [`gemini::GeminiEmbeddingProvider`], a `reqwest`
//!   client for the Gemini embedding API.

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod source;

#[cfg(feature = "gemini")]
pub mod gemini;

pub use config::{IndexConfig, IndexConfigBuilder};
pub use document::{Document, EmbeddedDocument, QueryResult};
pub use embedding::EmbeddingProvider;
pub use error::{IndexError, Result};
pub use index::{SemanticIndex, SemanticIndexBuilder, cosine_similarity};
pub use source::{JsonFileSource, KnowledgeSource};
