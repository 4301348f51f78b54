//! Data types for knowledge base documents and query results.

use serde::{Deserialize, Serialize};

/// A knowledge base entry: a unique identifier paired with its text content.
///
/// Identifiers are typically the URL of the page the content was taken from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
}

/// A [`Document`] together with its computed embedding vector.
///
/// Derived data: the set of embedded documents is fully determined by the
/// document set and the embedding provider, and is cached after the first
/// successful build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedDocument {
    /// Identifier of the source document.
    pub id: String,
    /// The text content of the source document.
    pub text: String,
    /// The embedding vector for the document text.
    pub embedding: Vec<f32>,
}

/// A ranked retrieval hit returned by a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Identifier of the matched document.
    pub id: String,
    /// Cosine similarity between the query and the document (higher is more relevant).
    pub score: f32,
    /// The document text, whitespace-trimmed.
    pub text: String,
}
