//! Vector store trait, default index resolution, and one-time index creation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::document::{Chunk, VectorRecord};
use crate::error::{RagError, Result};

/// A storage backend for vector records with K-nearest-neighbour search.
///
/// Handles are shared across many concurrent workers, so implementations must
/// be safe for concurrent use.
///
/// # Example
///
/// ```rust,ignore
/// use smart_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_index("docs_index", "docs_index:", 768).await?;
/// store.store_record("docs_index:main.go:0", &record).await?;
/// let chunks = store.search(&query_embedding, "docs_index", 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of every index known to the store, in the store's native order.
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Create `index_name` over records whose key starts with `key_prefix`.
    ///
    /// Idempotent: an existing index with the same dimension is left untouched.
    /// An existing index with a different dimension, or a failed creation, is a
    /// [`RagError::SchemaError`].
    async fn ensure_index(&self, index_name: &str, key_prefix: &str, dim: usize) -> Result<()>;

    /// Write (or overwrite) one record under `key`.
    async fn store_record(&self, key: &str, record: &VectorRecord) -> Result<()>;

    /// Return the `top_k` records closest to `query_embedding`, closest first.
    ///
    /// An index with no matching records yields an empty `Vec`.
    async fn search(
        &self,
        query_embedding: &[f32],
        index_name: &str,
        top_k: usize,
    ) -> Result<Vec<Chunk>>;
}

/// What to do when no index matches the requested name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFallback {
    /// Use the first index the store lists. Which one that is depends on the store.
    #[default]
    FirstAvailable,
    /// Fail with [`RagError::NoIndexError`].
    FailClosed,
}

/// Resolve `candidate` against the store's indexes, falling back to the first one listed.
///
/// # Errors
///
/// Returns [`RagError::NoIndexError`] when the store has no indexes.
pub async fn resolve_default_index(store: &dyn VectorStore, candidate: &str) -> Result<String> {
    resolve_index(store, candidate, IndexFallback::FirstAvailable).await
}

/// Resolve `candidate` against the store's indexes using an explicit fallback policy.
pub async fn resolve_index(
    store: &dyn VectorStore,
    candidate: &str,
    fallback: IndexFallback,
) -> Result<String> {
    let indexes = store.list_indexes().await?;
    if indexes.iter().any(|name| name == candidate) {
        return Ok(candidate.to_string());
    }
    match (fallback, indexes.into_iter().next()) {
        (IndexFallback::FirstAvailable, Some(first)) => {
            warn!(candidate, fallback = %first, "index not found, using first available index");
            Ok(first)
        }
        _ => Err(RagError::NoIndexError),
    }
}

/// Guards index creation so each index is created at most once per process.
///
/// Every worker writing to the same index shares one guard. The first caller
/// for a name runs [`VectorStore::ensure_index`]; later callers with the same
/// dimension return immediately, and a later caller with a different
/// dimension gets a [`RagError::SchemaError`]. The store-level "already
/// exists" tolerance still covers other processes racing on the same index.
pub struct IndexGuard {
    store: Arc<dyn VectorStore>,
    created: Mutex<HashMap<String, usize>>,
}

impl IndexGuard {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store, created: Mutex::new(HashMap::new()) }
    }

    /// Ensure `index_name` exists with dimension `dim`.
    ///
    /// # Errors
    ///
    /// Every failure is reported as a [`RagError::SchemaError`].
    pub async fn ensure(&self, index_name: &str, key_prefix: &str, dim: usize) -> Result<()> {
        let mut created = self.created.lock().await;
        match created.get(index_name) {
            Some(&existing) if existing == dim => return Ok(()),
            Some(&existing) => {
                return Err(RagError::SchemaError {
                    index: index_name.to_string(),
                    message: format!("index was created with dimension {existing}, got {dim}"),
                });
            }
            None => {}
        }

        match self.store.ensure_index(index_name, key_prefix, dim).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                return Err(RagError::SchemaError {
                    index: index_name.to_string(),
                    message: format!("failed to ensure index with dimension {dim}: {e}"),
                });
            }
        }
        debug!(index = index_name, dim, "index ready");
        created.insert(index_name.to_string(), dim);
        Ok(())
    }

    /// The dimension `index_name` was ensured with, if it has been.
    pub async fn dimension(&self, index_name: &str) -> Option<usize> {
        self.created.lock().await.get(index_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingStore {
        indexes: Vec<String>,
        ensure_calls: AtomicUsize,
        fail_ensure: bool,
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        async fn list_indexes(&self) -> Result<Vec<String>> {
            Ok(self.indexes.clone())
        }

        async fn ensure_index(&self, _: &str, _: &str, _: usize) -> Result<()> {
            self.ensure_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_ensure {
                return Err(RagError::VectorStoreError {
                    backend: "test".into(),
                    message: "connection reset".into(),
                });
            }
            Ok(())
        }

        async fn store_record(&self, _: &str, _: &VectorRecord) -> Result<()> {
            Ok(())
        }

        async fn search(&self, _: &[f32], _: &str, _: usize) -> Result<Vec<Chunk>> {
            Ok(Vec::new())
        }
    }

    fn store_with(indexes: &[&str]) -> CountingStore {
        CountingStore {
            indexes: indexes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn resolve_prefers_exact_match() {
        let store = store_with(&["other_index", "proj_index"]);
        assert_eq!(resolve_default_index(&store, "proj_index").await.unwrap(), "proj_index");
    }

    #[tokio::test]
    async fn resolve_falls_back_to_first_listed() {
        let store = store_with(&["other_index", "third_index"]);
        assert_eq!(resolve_default_index(&store, "proj_index").await.unwrap(), "other_index");
    }

    #[tokio::test]
    async fn resolve_fails_without_indexes() {
        let store = store_with(&[]);
        let err = resolve_default_index(&store, "proj_index").await.unwrap_err();
        assert!(matches!(err, RagError::NoIndexError));
    }

    #[tokio::test]
    async fn fail_closed_policy_refuses_to_guess() {
        let store = store_with(&["other_index"]);
        let err =
            resolve_index(&store, "proj_index", IndexFallback::FailClosed).await.unwrap_err();
        assert!(matches!(err, RagError::NoIndexError));
    }

    #[tokio::test]
    async fn guard_creates_once_across_concurrent_callers() {
        let store = Arc::new(store_with(&[]));
        let guard = Arc::new(IndexGuard::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move { guard.ensure("idx", "idx:", 8).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.ensure_calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.dimension("idx").await, Some(8));
    }

    #[tokio::test]
    async fn guard_rejects_second_dimension() {
        let guard = IndexGuard::new(Arc::new(store_with(&[])));
        guard.ensure("idx", "idx:", 8).await.unwrap();
        let err = guard.ensure("idx", "idx:", 4).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("dimension 8"));
    }

    #[tokio::test]
    async fn guard_turns_store_failures_into_schema_errors() {
        let store = CountingStore { fail_ensure: true, ..Default::default() };
        let guard = IndexGuard::new(Arc::new(store));
        let err = guard.ensure("idx", "idx:", 8).await.unwrap_err();
        assert!(matches!(err, RagError::SchemaError { .. }));
        assert_eq!(guard.dimension("idx").await, None);
    }
}
