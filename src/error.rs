//! Error types for the `kb-index` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in retrieval index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The knowledge source could not be read.
    #[error("knowledge source unavailable ({}): {source}", .path.display())]
    SourceUnavailable {
        /// Path of the knowledge source that failed to load.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The knowledge source was readable but its structure did not match
    /// the expected shape (an object mapping identifier to text).
    #[error("malformed knowledge source: {0}")]
    MalformedSource(String),

    /// The embedding provider call failed.
    #[error("embedding provider error ({provider}): {message}")]
    Provider {
        /// The embedding provider (or operation) that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A zero-magnitude vector was passed to a similarity computation.
    #[error("degenerate vector: {0}")]
    DegenerateVector(String),

    /// The knowledge base contains no documents.
    #[error("the knowledge base contains no documents")]
    EmptyIndex,

    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// A convenience result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
