//! Configuration for the semantic index.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Configuration parameters for a [`SemanticIndex`](crate::SemanticIndex).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Number of top results returned when the caller does not specify one.
    pub default_top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { default_top_k: 3 }
    }
}

impl IndexConfig {
    /// Create a new builder for constructing an [`IndexConfig`].
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`IndexConfig`].
#[derive(Debug, Clone, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    /// Set the default number of top results returned by queries.
    pub fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Build the [`IndexConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] if `default_top_k == 0`.
    pub fn build(self) -> Result<IndexConfig> {
        if self.config.default_top_k == 0 {
            return Err(IndexError::InvalidArgument("default_top_k must be at least 1".into()));
        }
        Ok(self.config)
    }
}
