//! Knowledge source trait and the JSON file source.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::{IndexError, Result};

/// A read-only store of knowledge base documents.
///
/// Implementations load the full document collection from some backing
/// store. The index calls [`load`](KnowledgeSource::load) at most once per
/// cache lifetime; the collection is treated as immutable after that.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Load the full document collection from the backing store.
    ///
    /// The returned order is preserved by the index and is used as the
    /// tie-break order for equally scored query results.
    async fn load(&self) -> Result<Vec<Document>>;
}

/// A [`KnowledgeSource`] reading a JSON file from disk.
///
/// The file must contain a single top-level object mapping document
/// identifier to text content:
///
/// ```json
/// {
///     "https://example.com/pricing": "Transparent pricing with no monthly fees ...",
///     "https://example.com/support": "Contact our support team 24/7 ..."
/// }
/// ```
///
/// Any other shape (an array, nested objects, non-string values) is
/// rejected with [`IndexError::MalformedSource`] rather than silently
/// degrading to an empty knowledge base.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading from the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path this source reads from.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl KnowledgeSource for JsonFileSource {
    async fn load(&self) -> Result<Vec<Document>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| IndexError::SourceUnavailable { path: self.path.clone(), source })?;

        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            IndexError::MalformedSource(format!("{}: invalid JSON: {e}", self.path.display()))
        })?;

        let Value::Object(entries) = value else {
            return Err(IndexError::MalformedSource(format!(
                "{}: expected a top-level object mapping identifier to text",
                self.path.display()
            )));
        };

        let mut documents = Vec::with_capacity(entries.len());
        for (id, text) in entries {
            let Value::String(text) = text else {
                return Err(IndexError::MalformedSource(format!(
                    "{}: value for '{id}' is not a string",
                    self.path.display()
                )));
            };
            documents.push(Document { id, text });
        }

        debug!(path = %self.path.display(), count = documents.len(), "loaded knowledge base");
        Ok(documents)
    }
}
