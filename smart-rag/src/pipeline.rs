//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates indexing (walk, chunk, embed, store) and
//! answering (embed, retrieve, assemble, generate) by composing an
//! [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`], and an optional
//! [`GenerationProvider`].
//!
//! # Example
//!
//! ```rust,ignore
//! use smart_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::from_env()?)
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let report = pipeline.index_directory(Path::new("./my-project")).await?;
//! let answer = pipeline.answer_in(&report.index_name, "Where are chunks keyed?").await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::changed::changed_files;
use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::context::assemble;
use crate::document::{Chunk, ChunkQuery, index_name_for};
use crate::embedding::{EmbeddingProvider, TimeoutEmbedder};
use crate::error::{RagError, Result};
use crate::indexer::{IndexReport, Indexer};
use crate::prompt::{
    EXPLAIN_TOP_K, GenerationProvider, REVIEW_TOP_K, ReviewDetail, SYSTEM_PROMPT, assemble_prompt,
    error_search_query, explain_error_question, generate_with_timeout, review_question,
};
use crate::retrieval::{QueryFailure, RetrievalOutcome, retrieve};
use crate::vectorstore::{IndexFallback, VectorStore, resolve_index};

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`] and share it; it owns the
/// [`Indexer`] whose index guard must live as long as the process.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: Option<Arc<dyn GenerationProvider>>,
    index_fallback: IndexFallback,
    indexer: Indexer,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Index every eligible file under `root`.
    ///
    /// # Errors
    ///
    /// See [`Indexer::index_directory`].
    pub async fn index_directory(&self, root: &Path) -> Result<IndexReport> {
        self.indexer.index_directory(root, CancellationToken::new()).await
    }

    /// Like [`index_directory`](Self::index_directory), stopping early when `cancel` fires.
    pub async fn index_directory_with_cancel(
        &self,
        root: &Path,
        cancel: CancellationToken,
    ) -> Result<IndexReport> {
        self.indexer.index_directory(root, cancel).await
    }

    /// Index an explicit list of files under `root`.
    pub async fn index_paths(
        &self,
        root: &Path,
        paths: Vec<PathBuf>,
        cancel: CancellationToken,
    ) -> Result<IndexReport> {
        self.indexer.index_paths(root, paths, cancel).await
    }

    /// Re-index only the files of `repo` changed between `base_ref` and `HEAD`.
    pub async fn reindex_changed(&self, repo: &Path, base_ref: &str) -> Result<IndexReport> {
        let paths = changed_files(repo, base_ref).await?;
        info!(repo = %repo.display(), changed = paths.len(), "re-indexing changed files");
        self.indexer.index_paths(repo, paths, CancellationToken::new()).await
    }

    /// Resolve the index to query, falling back according to the configured policy.
    ///
    /// `candidate` defaults to the configured index name, then to the name
    /// derived from the current directory.
    pub async fn resolve_index(&self, candidate: Option<&str>) -> Result<String> {
        let candidate = match candidate.or(self.config.index_name.as_deref()) {
            Some(name) => name.to_string(),
            None => {
                let cwd = std::env::current_dir().map_err(|e| RagError::io(".", e))?;
                index_name_for(&cwd)
            }
        };
        resolve_index(self.vector_store.as_ref(), &candidate, self.index_fallback).await
    }

    /// Embed each question and retrieve `top_k` chunks for it from `index_name`.
    ///
    /// Questions that fail to embed are reported as failures in the outcome,
    /// exactly like queries that fail to search.
    pub async fn retrieve_questions(
        &self,
        index_name: &str,
        questions: &[&str],
    ) -> RetrievalOutcome {
        self.retrieve_top_k(index_name, questions, self.config.top_k).await
    }

    async fn retrieve_top_k(
        &self,
        index_name: &str,
        questions: &[&str],
        top_k: usize,
    ) -> RetrievalOutcome {
        let mut queries = Vec::with_capacity(questions.len());
        let mut positions = Vec::with_capacity(questions.len());
        let mut embed_failures = Vec::new();
        for (position, question) in questions.iter().copied().enumerate() {
            match self.embedding_provider.embed(question).await {
                Ok(embedding) => {
                    queries.push((ChunkQuery::new(question, index_name, top_k), embedding));
                    positions.push(position);
                }
                Err(error) => {
                    error!(question, error = %error, "query embedding failed");
                    embed_failures.push(QueryFailure {
                        position,
                        query_text: question.to_string(),
                        error,
                    });
                }
            }
        }

        let mut outcome =
            retrieve(self.vector_store.clone(), queries, self.config.retrieval_workers).await;
        for failure in &mut outcome.failures {
            failure.position = positions[failure.position];
        }
        if !embed_failures.is_empty() {
            embed_failures.append(&mut outcome.failures);
            outcome.failures = embed_failures;
        }
        outcome
    }

    /// Pack `chunks` into the configured context budget.
    pub fn build_context(&self, chunks: &[Chunk]) -> String {
        assemble(chunks, self.config.char_budget)
    }

    /// Answer `question` from the index resolved by [`resolve_index`](Self::resolve_index).
    pub async fn answer(&self, question: &str) -> Result<String> {
        let index_name = self.resolve_index(None).await?;
        self.answer_in(&index_name, question).await
    }

    /// Answer `question` from `index_name`.
    ///
    /// Without a generator the assembled prompt itself is returned.
    ///
    /// # Errors
    ///
    /// Fails with the last retrieval error when every query failed, or with
    /// the generator's error.
    pub async fn answer_in(&self, index_name: &str, question: &str) -> Result<String> {
        let mut outcome = self.retrieve_questions(index_name, &[question]).await;
        if outcome.chunks.is_empty() {
            if let Some(failure) = outcome.failures.pop() {
                return Err(failure.error);
            }
        }
        self.complete(question, &outcome.chunks).await
    }

    /// Answer `question` about the file at `path`, drawing [`REVIEW_TOP_K`]
    /// chunks from the resolved index.
    ///
    /// Retrieval failures are logged and the review goes ahead with whatever
    /// context was found.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidInput`] for a blank question, the index resolution
    /// error, or the generator's error.
    pub async fn review_file(
        &self,
        path: &Path,
        question: &str,
        detail: ReviewDetail,
    ) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("a review needs a question".to_string()));
        }
        let index_name = self.resolve_index(None).await?;
        let outcome = self.retrieve_top_k(&index_name, &[question], REVIEW_TOP_K).await;
        if let Some(error) = outcome.last_error() {
            warn!(index = %index_name, error = %error, "review retrieval failed");
        }
        info!(path = %path.display(), %detail, chunks = outcome.chunks.len(), "reviewing file");
        let question = review_question(&path.display().to_string(), question, detail);
        self.complete(&question, &outcome.chunks).await
    }

    /// Explain an error message, drawing [`EXPLAIN_TOP_K`] related chunks
    /// from the resolved index when there is one.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidInput`] for a blank message, or the generator's error.
    pub async fn explain_error(&self, error_text: &str) -> Result<String> {
        let error_text = error_text.trim();
        if error_text.is_empty() {
            return Err(RagError::InvalidInput("no error message to explain".to_string()));
        }
        let chunks = match self.resolve_index(None).await {
            Ok(index_name) => {
                let query = error_search_query(error_text);
                let outcome =
                    self.retrieve_top_k(&index_name, &[query.as_str()], EXPLAIN_TOP_K).await;
                if let Some(error) = outcome.last_error() {
                    warn!(index = %index_name, error = %error, "error context retrieval failed");
                }
                outcome.chunks
            }
            Err(e) => {
                warn!(error = %e, "explaining without codebase context");
                Vec::new()
            }
        };
        self.complete(&explain_error_question(error_text), &chunks).await
    }

    /// Assemble the prompt for `question` over `chunks` and run the generator.
    /// Without a generator the prompt itself is returned.
    async fn complete(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let context = self.build_context(chunks);
        let prompt = assemble_prompt(SYSTEM_PROMPT, question, &context);

        let Some(generator) = &self.generator else {
            return Ok(prompt);
        };
        let answer =
            generate_with_timeout(generator.as_ref(), &prompt, self.config.generate_timeout).await?;
        info!(model = generator.model_name(), chunks = chunks.len(), "generated answer");
        Ok(answer)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_store` are required. The chunker
/// defaults to a [`FixedSizeChunker`] using the configured size and overlap.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .generator(Arc::new(generator))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    generator: Option<Arc<dyn GenerationProvider>>,
    index_fallback: IndexFallback,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Replace the default chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the model that turns prompts into answers.
    pub fn generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Choose what happens when the requested index does not exist.
    pub fn index_fallback(mut self, fallback: IndexFallback) -> Self {
        self.index_fallback = fallback;
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap))
        });

        let indexer = Indexer::new(
            config.clone(),
            chunker,
            embedding_provider.clone(),
            vector_store.clone(),
        );
        let embedding_provider: Arc<dyn EmbeddingProvider> =
            Arc::new(TimeoutEmbedder::new(embedding_provider, config.embed_timeout));

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            generator: self.generator,
            index_fallback: self.index_fallback,
            indexer,
        })
    }
}
