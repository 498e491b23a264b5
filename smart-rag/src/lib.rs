//! Codebase indexing and retrieval for retrieval-augmented generation.
//!
//! This crate provides:
//! - Code-point chunking with overlap ([`chunking`])
//! - A staged, concurrent indexing pipeline from a directory tree into a
//!   vector store ([`indexer`])
//! - A RediSearch vector store client (feature `redis`, on by default) and an
//!   in-memory store for tests and development
//! - Multi-query retrieval fan-out ([`retrieval`]) and budgeted context
//!   assembly ([`context`])
//! - Embedding and generation provider seams, with Vertex AI (feature
//!   `vertex`) and OpenAI (feature `openai`) implementations
//!
//! [`RagPipeline`] ties these together.

pub mod changed;
pub mod chunking;
pub mod codec;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod inmemory;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod telemetry;
pub mod vectorstore;
pub mod walker;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "redis")]
pub mod redisearch;
#[cfg(feature = "vertex")]
pub mod vertex;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, ChunkQuery, FileEmbedding, VectorRecord};
pub use embedding::{EmbeddingProvider, TimeoutEmbedder};
pub use error::{RagError, Result};
pub use indexer::{IndexFailure, IndexReport, Indexer};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::{GenerationProvider, ReviewDetail};
pub use retrieval::{QueryFailure, RetrievalOutcome};
pub use vectorstore::{IndexFallback, IndexGuard, VectorStore, resolve_default_index};

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "redis")]
pub use redisearch::RedisVectorStore;
#[cfg(feature = "vertex")]
pub use vertex::{VertexEmbeddingProvider, VertexGenerationProvider};
