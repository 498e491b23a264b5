//! Concurrent multi-query retrieval.
//!
//! Each `(query, embedding)` pair is searched by one worker of a fixed pool.
//! A failing query never cancels the others; its error is collected into the
//! [`RetrievalOutcome`] alongside the chunks of the queries that succeeded.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::document::{Chunk, ChunkQuery};
use crate::error::RagError;
use crate::vectorstore::VectorStore;

/// Number of retrieval workers used when none is configured.
pub const DEFAULT_RETRIEVAL_WORKERS: usize = 7;

/// A query that failed during retrieval.
#[derive(Debug)]
pub struct QueryFailure {
    /// Position of the query in the input list.
    pub position: usize,
    pub query_text: String,
    pub error: RagError,
}

/// Chunks from every successful query plus the failures of the rest.
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    /// Results concatenated in input-query order. Not deduplicated.
    pub chunks: Vec<Chunk>,
    /// Failures in the order they were received.
    pub failures: Vec<QueryFailure>,
}

impl RetrievalOutcome {
    /// The most recently received failure.
    pub fn last_error(&self) -> Option<&RagError> {
        self.failures.last().map(|f| &f.error)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Job {
    position: usize,
    query: ChunkQuery,
    embedding: Vec<f32>,
}

/// Run every query against `store` using up to `workers` concurrent workers.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = retrieve(store, vec![(ChunkQuery::new("q", "idx", 5), embedding)], 7).await;
/// if outcome.chunks.is_empty() {
///     if let Some(err) = outcome.last_error() { eprintln!("{err}"); }
/// }
/// ```
pub async fn retrieve(
    store: Arc<dyn VectorStore>,
    queries: Vec<(ChunkQuery, Vec<f32>)>,
    workers: usize,
) -> RetrievalOutcome {
    let total = queries.len();
    if total == 0 {
        return RetrievalOutcome::default();
    }
    let workers = workers.max(1);

    let (job_tx, job_rx) = mpsc::channel::<Job>(total);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, mut result_rx) =
        mpsc::channel::<(usize, String, crate::error::Result<Vec<Chunk>>)>(total);

    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let store = store.clone();
        let job_rx = job_rx.clone();
        let result_tx = result_tx.clone();
        pool.spawn(async move {
            loop {
                let job = job_rx.lock().await.recv().await;
                let Some(Job { position, query, embedding }) = job else {
                    break;
                };
                let result = store.search(&embedding, &query.index_name, query.top_k).await;
                debug!(worker, position, ok = result.is_ok(), "query finished");
                if result_tx.send((position, query.query_text, result)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(result_tx);

    for (position, (query, embedding)) in queries.into_iter().enumerate() {
        // Capacity equals the job count, so this never waits.
        if job_tx.send(Job { position, query, embedding }).await.is_err() {
            break;
        }
    }
    drop(job_tx);

    let mut slots: Vec<Option<Vec<Chunk>>> = (0..total).map(|_| None).collect();
    let mut outcome = RetrievalOutcome::default();
    while let Some((position, query_text, result)) = result_rx.recv().await {
        match result {
            Ok(chunks) => slots[position] = Some(chunks),
            Err(error) => {
                warn!(position, query = %query_text, error = %error, "retrieval query failed");
                outcome.failures.push(QueryFailure { position, query_text, error });
            }
        }
    }

    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "retrieval worker aborted");
        }
    }

    let answered = slots.iter().filter(|s| s.is_some()).count() + outcome.failures.len();
    if answered < total {
        for (position, slot) in slots.iter().enumerate() {
            let failed = outcome.failures.iter().any(|f| f.position == position);
            if slot.is_none() && !failed {
                outcome.failures.push(QueryFailure {
                    position,
                    query_text: String::new(),
                    error: RagError::SearchError {
                        index: String::new(),
                        message: "retrieval worker stopped before answering".to_string(),
                    },
                });
            }
        }
    }

    outcome.chunks = slots.into_iter().flatten().flatten().collect();
    debug!(
        queries = total,
        chunks = outcome.chunks.len(),
        failures = outcome.failures.len(),
        "retrieval complete"
    );
    outcome
}
