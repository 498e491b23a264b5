//! In-memory vector store using cosine distance.
//!
//! [`InMemoryVectorStore`] mirrors the RediSearch layout: records live in one
//! flat key space and an index covers every record whose key starts with its
//! prefix. It is suitable for development and tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, VectorRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

#[derive(Debug, Clone)]
struct IndexDef {
    prefix: String,
    dim: usize,
}

#[derive(Debug, Default)]
struct Inner {
    // Creation order is kept so `list_indexes` is deterministic.
    indexes: Vec<(String, IndexDef)>,
    records: BTreeMap<String, VectorRecord>,
}

/// An in-memory [`VectorStore`] with brute-force cosine distance search.
///
/// All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use smart_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_index("docs_index", "docs_index:", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, across all indexes.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Fetch a stored record by key.
    pub async fn get(&self, key: &str) -> Option<VectorRecord> {
        self.inner.read().await.records.get(key).cloned()
    }

    fn not_found(index_name: &str) -> RagError {
        RagError::SearchError {
            index: index_name.to_string(),
            message: "no such index".to_string(),
        }
    }
}

/// Cosine distance (`1 - cosine similarity`). Zero-magnitude vectors are at distance 1.
fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.indexes.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn ensure_index(&self, index_name: &str, key_prefix: &str, dim: usize) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some((_, def)) = inner.indexes.iter().find(|(name, _)| name == index_name) {
            if def.dim != dim {
                return Err(RagError::SchemaError {
                    index: index_name.to_string(),
                    message: format!("existing index has dimension {}, requested {dim}", def.dim),
                });
            }
            return Ok(());
        }
        inner
            .indexes
            .push((index_name.to_string(), IndexDef { prefix: key_prefix.to_string(), dim }));
        Ok(())
    }

    async fn store_record(&self, key: &str, record: &VectorRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        // Hashes under an index prefix must match that index's dimension.
        if let Some((name, def)) = inner
            .indexes
            .iter()
            .find(|(_, def)| key.starts_with(&def.prefix) && def.dim != record.embedding.len())
        {
            return Err(RagError::SchemaError {
                index: name.clone(),
                message: format!(
                    "record '{key}' has dimension {}, index expects {}",
                    record.embedding.len(),
                    def.dim
                ),
            });
        }
        inner.records.insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        index_name: &str,
        top_k: usize,
    ) -> Result<Vec<Chunk>> {
        let inner = self.inner.read().await;
        let (_, def) = inner
            .indexes
            .iter()
            .find(|(name, _)| name == index_name)
            .ok_or_else(|| Self::not_found(index_name))?;
        if query_embedding.len() != def.dim {
            return Err(RagError::SearchError {
                index: index_name.to_string(),
                message: format!(
                    "query has dimension {}, index expects {}",
                    query_embedding.len(),
                    def.dim
                ),
            });
        }

        let mut scored: Vec<Chunk> = inner
            .records
            .range(def.prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&def.prefix))
            .map(|(_, record)| Chunk {
                text: record.text.clone(),
                metadata: HashMap::from([("file".to_string(), record.file.clone())]),
                score: cosine_distance(&record.embedding, query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
