//! Concurrent indexing of a directory tree into a vector store.
//!
//! Work flows through three stages joined by bounded channels:
//!
//! ```text
//! walk -> paths -> file workers (read + split) -> chunks -> embed workers (embed + store)
//! ```
//!
//! Each stage's channel closes when the last producer drops its sender, so the
//! run finishes once every chunk has been handled. Per-item failures (an
//! unreadable file, a chunk that could not be embedded or stored) are collected
//! into the [`IndexReport`]. A schema failure is fatal: it cancels the run and
//! is returned as the error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, read_text};
use crate::config::RagConfig;
use crate::document::{FileEmbedding, index_name_for, key_prefix, record_key};
use crate::embedding::{EmbeddingProvider, TimeoutEmbedder};
use crate::error::{RagError, Result};
use crate::vectorstore::{IndexGuard, VectorStore};
use crate::walker::{Eligibility, walk_eligible};

/// A unit of work that failed without stopping the run.
#[derive(Debug)]
pub struct IndexFailure {
    pub path: PathBuf,
    /// Ordinal of the failed chunk, or `None` when the whole file failed.
    pub chunk: Option<usize>,
    pub error: RagError,
}

/// Summary of a completed indexing run.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub index_name: String,
    /// Files that were read and split.
    pub files_indexed: usize,
    /// Chunks embedded and written to the store.
    pub chunks_stored: usize,
    pub failures: Vec<IndexFailure>,
}

struct ChunkJob {
    path: PathBuf,
    chunk_index: usize,
    text: String,
}

enum Event {
    Failure(IndexFailure),
    Fatal(RagError),
}

#[derive(Default)]
struct Counters {
    files_indexed: AtomicUsize,
    chunks_stored: AtomicUsize,
}

/// State shared by every worker of one run.
struct Run {
    index_name: String,
    prefix: String,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<Event>,
    counters: Arc<Counters>,
}

impl Run {
    fn fail(&self, path: &Path, chunk: Option<usize>, error: RagError) {
        let failure = IndexFailure { path: path.to_path_buf(), chunk, error };
        let _ = self.events.send(Event::Failure(failure));
    }

    fn fatal(&self, error: RagError) {
        self.cancel.cancel();
        let _ = self.events.send(Event::Fatal(error));
    }
}

/// Indexes files into a vector store using a chunker and an embedding provider.
///
/// One `Indexer` should be shared for the life of the process so that each
/// index is created at most once.
pub struct Indexer {
    config: RagConfig,
    eligibility: Eligibility,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    guard: Arc<IndexGuard>,
}

impl Indexer {
    /// Create an indexer. Every embedding call is bounded by `config.embed_timeout`.
    pub fn new(
        config: RagConfig,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(TimeoutEmbedder::new(embedder, config.embed_timeout));
        Self {
            eligibility: Eligibility::from_config(&config),
            guard: Arc::new(IndexGuard::new(store.clone())),
            config,
            chunker,
            embedder,
            store,
        }
    }

    /// The index a run over `root` writes to.
    pub fn index_name(&self, root: &Path) -> String {
        if let Some(name) = &self.config.index_name {
            return name.clone();
        }
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        index_name_for(&root)
    }

    /// Walk `root` and index every eligible file.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IoError`] if `root` cannot be walked,
    /// [`RagError::SchemaError`] if the index cannot be created or a vector
    /// does not match its dimension, and [`RagError::Cancelled`] if `cancel`
    /// fires first.
    pub async fn index_directory(
        &self,
        root: &Path,
        cancel: CancellationToken,
    ) -> Result<IndexReport> {
        let walk_root = root.to_path_buf();
        let eligibility = self.eligibility.clone();
        self.run(root, cancel, move |tx, run| {
            tokio::task::spawn_blocking(move || {
                walk_eligible(
                    &walk_root,
                    &eligibility,
                    |path| !run.cancel.is_cancelled() && tx.blocking_send(path).is_ok(),
                    |path, error| run.fail(&path, None, error),
                )
            })
        })
        .await
    }

    /// Index an explicit list of files under `root`, such as the output of
    /// [`changed_files`](crate::changed::changed_files).
    ///
    /// Paths are filtered by the same rules as a directory walk, judged
    /// relative to `root`, and must still exist.
    pub async fn index_paths(
        &self,
        root: &Path,
        paths: Vec<PathBuf>,
        cancel: CancellationToken,
    ) -> Result<IndexReport> {
        let base = root.to_path_buf();
        let eligibility = self.eligibility.clone();
        self.run(root, cancel, move |tx, run| {
            tokio::spawn(async move {
                for path in paths {
                    let relative = path.strip_prefix(&base).unwrap_or(&path);
                    if !eligibility.allows_path(relative) || !path.is_file() {
                        debug!(path = %path.display(), "skipping ineligible path");
                        continue;
                    }
                    let sent = tokio::select! {
                        _ = run.cancel.cancelled() => false,
                        sent = tx.send(path) => sent.is_ok(),
                    };
                    if !sent {
                        break;
                    }
                }
                Ok::<(), RagError>(())
            })
        })
        .await
    }

    async fn run<F>(&self, root: &Path, cancel: CancellationToken, source: F) -> Result<IndexReport>
    where
        F: FnOnce(mpsc::Sender<PathBuf>, Arc<Run>) -> tokio::task::JoinHandle<Result<()>>,
    {
        let index_name = self.index_name(root);
        let run_cancel = cancel.child_token();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let run = Arc::new(Run {
            prefix: key_prefix(&index_name),
            index_name: index_name.clone(),
            cancel: run_cancel.clone(),
            events: event_tx,
            counters: counters.clone(),
        });
        info!(index = %index_name, root = %root.display(), "indexing started");

        let capacity = self.config.queue_capacity;
        let (path_tx, path_rx) = mpsc::channel::<PathBuf>(capacity);
        let (chunk_tx, chunk_rx) = mpsc::channel::<ChunkJob>(capacity);
        let path_rx = Arc::new(Mutex::new(path_rx));
        let chunk_rx = Arc::new(Mutex::new(chunk_rx));

        let mut workers = JoinSet::new();
        for _ in 0..self.config.file_workers {
            workers.spawn(file_worker(
                path_rx.clone(),
                chunk_tx.clone(),
                self.chunker.clone(),
                run.clone(),
            ));
        }
        for _ in 0..self.config.embed_workers {
            workers.spawn(embed_worker(
                chunk_rx.clone(),
                self.embedder.clone(),
                self.store.clone(),
                self.guard.clone(),
                run.clone(),
            ));
        }
        // Workers own the only remaining handles, so the channels close as they finish.
        drop((path_rx, chunk_rx, chunk_tx));

        let source = source(path_tx, run.clone());
        // The event channel closes once the source and the last worker drop their `Run`.
        drop(run);

        let mut failures = Vec::new();
        let mut fatal: Option<RagError> = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                Event::Failure(failure) => {
                    warn!(
                        path = %failure.path.display(),
                        chunk = ?failure.chunk,
                        error = %failure.error,
                        "indexing item failed"
                    );
                    failures.push(failure);
                }
                Event::Fatal(e) => {
                    if fatal.is_none() {
                        error!(index = %index_name, error = %e, "indexing aborted");
                        fatal = Some(e);
                    }
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "indexing worker aborted");
            }
        }
        let source_result = source.await.map_err(|e| {
            RagError::io(root, std::io::Error::other(format!("walk task failed: {e}")))
        })?;

        if let Some(e) = fatal {
            return Err(e);
        }
        source_result?;
        if cancel.is_cancelled() {
            info!(index = %index_name, "indexing cancelled");
            return Err(RagError::Cancelled);
        }

        let report = IndexReport {
            index_name,
            files_indexed: counters.files_indexed.load(Ordering::Relaxed),
            chunks_stored: counters.chunks_stored.load(Ordering::Relaxed),
            failures,
        };
        info!(
            index = %report.index_name,
            files = report.files_indexed,
            chunks = report.chunks_stored,
            failures = report.failures.len(),
            "indexing finished"
        );
        Ok(report)
    }
}

/// Receive from a shared receiver unless the run is cancelled.
async fn next<T>(rx: &Mutex<mpsc::Receiver<T>>, cancel: &CancellationToken) -> Option<T> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        item = async { rx.lock().await.recv().await } => item,
    }
}

async fn file_worker(
    paths: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    chunks: mpsc::Sender<ChunkJob>,
    chunker: Arc<dyn Chunker>,
    run: Arc<Run>,
) {
    while let Some(path) = next(&paths, &run.cancel).await {
        let text = match read_text(&path).await {
            Ok(Some(text)) => text,
            Ok(None) => continue,
            Err(e) => {
                run.fail(&path, None, e);
                continue;
            }
        };
        let pieces = chunker.split(&text);
        debug!(path = %path.display(), chunks = pieces.len(), "split file");
        run.counters.files_indexed.fetch_add(1, Ordering::Relaxed);

        for (chunk_index, text) in pieces.into_iter().enumerate() {
            let job = ChunkJob { path: path.clone(), chunk_index, text };
            let sent = tokio::select! {
                _ = run.cancel.cancelled() => false,
                sent = chunks.send(job) => sent.is_ok(),
            };
            if !sent {
                return;
            }
        }
    }
}

async fn embed_worker(
    jobs: Arc<Mutex<mpsc::Receiver<ChunkJob>>>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    guard: Arc<IndexGuard>,
    run: Arc<Run>,
) {
    while let Some(ChunkJob { path, chunk_index, text }) = next(&jobs, &run.cancel).await {
        let embedded = tokio::select! {
            _ = run.cancel.cancelled() => return,
            embedded = embedder.embed(&text) => embedded,
        };
        let embedding = match embedded {
            Ok(v) if v.is_empty() => {
                let error = RagError::EmptyResponseError { provider: "embedder".to_string() };
                run.fail(&path, Some(chunk_index), error);
                continue;
            }
            Ok(v) => v,
            Err(e) => {
                run.fail(&path, Some(chunk_index), e);
                continue;
            }
        };

        // Workers queued behind a failed creation see the cancellation first.
        let ensured = tokio::select! {
            biased;
            _ = run.cancel.cancelled() => return,
            ensured = guard.ensure(&run.index_name, &run.prefix, embedding.len()) => ensured,
        };
        if let Err(e) = ensured {
            run.fatal(e);
            return;
        }

        let file = path.display().to_string();
        let key = record_key(&run.index_name, &file, chunk_index);
        let record =
            FileEmbedding { path: file, chunk_index, content: text, embedding }.into_record();
        let stored = tokio::select! {
            _ = run.cancel.cancelled() => return,
            stored = store.store_record(&key, &record) => stored,
        };
        match stored {
            Ok(()) => {
                run.counters.chunks_stored.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.is_fatal() => {
                run.fatal(e);
                return;
            }
            Err(e) => run.fail(&path, Some(chunk_index), e),
        }
    }
}
