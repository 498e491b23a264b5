//! Error types for the `smart-rag` crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while indexing or retrieving.
#[derive(Debug, Error)]
pub enum RagError {
    /// A remote embedding or generation call failed (transport, quota, HTTP status).
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The remote call succeeded but returned no vector.
    #[error("Provider '{provider}' returned an empty response")]
    EmptyResponseError {
        /// The provider that produced the empty response.
        provider: String,
    },

    /// A remote call exceeded its time budget.
    #[error("{operation} timed out after {timeout:?}")]
    TimeoutError {
        /// The operation that timed out.
        operation: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// Index creation failed or a vector does not match the index dimension.
    ///
    /// Always fatal to an indexing run.
    #[error("Schema error for index '{index}': {message}")]
    SchemaError {
        /// The offending index.
        index: String,
        /// A description of the failure, including the dimension involved.
        message: String,
    },

    /// A similarity query failed at the transport or protocol level.
    #[error("Search error on index '{index}': {message}")]
    SearchError {
        /// The index being searched.
        index: String,
        /// A description of the failure.
        message: String,
    },

    /// A wire reply had an unexpected shape.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The store has no indexes to fall back to.
    #[error("No index found in the vector store")]
    NoIndexError,

    /// A filesystem read failed.
    #[error("I/O error on '{}': {source}", path.display())]
    IoError {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A vector store write or listing failed.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A caller supplied an empty or malformed argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A `git` invocation failed.
    #[error("Git error: {0}")]
    GitError(String),

    /// The generation step failed.
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// The operation was abandoned because its cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,
}

impl RagError {
    /// Whether this error must abort a whole indexing run instead of a single unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RagError::SchemaError { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RagError::IoError { path: path.into(), source }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
