//! Data types for retrieved chunks, queries, and indexing records.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A fragment returned by a similarity search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The stored chunk text.
    pub text: String,
    /// Every other returned field, such as `file`.
    pub metadata: HashMap<String, String>,
    /// Cosine distance to the query (lower is more similar).
    pub score: f64,
}

impl Chunk {
    /// The source file recorded for this chunk, if the store returned one.
    pub fn file(&self) -> Option<&str> {
        self.metadata.get("file").map(String::as_str)
    }
}

/// A retrieval request against one index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkQuery {
    /// The natural-language query.
    pub query_text: String,
    /// The index to search.
    pub index_name: String,
    /// Number of nearest neighbours to return.
    pub top_k: usize,
}

impl ChunkQuery {
    /// Create a query. A `top_k` of zero is raised to one.
    pub fn new(query_text: impl Into<String>, index_name: impl Into<String>, top_k: usize) -> Self {
        Self { query_text: query_text.into(), index_name: index_name.into(), top_k: top_k.max(1) }
    }
}

/// An embedded chunk produced during indexing, consumed by the storage step.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEmbedding {
    /// Path of the source file.
    pub path: String,
    /// Ordinal of the chunk within its file.
    pub chunk_index: usize,
    /// Full chunk text.
    pub content: String,
    /// The chunk's embedding.
    pub embedding: Vec<f32>,
}

impl FileEmbedding {
    /// Convert into the stored record form.
    pub fn into_record(self) -> VectorRecord {
        VectorRecord {
            text: self.content,
            file: self.path,
            chunk_index: self.chunk_index,
            embedding: self.embedding,
        }
    }
}

/// The stored form of one chunk.
///
/// The embedding is kept as floats here; stores encode it with
/// [`encode_vector`](crate::codec::encode_vector) on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub text: String,
    pub file: String,
    pub chunk_index: usize,
    pub embedding: Vec<f32>,
}

/// Derive the index name for a directory: `<basename>_index`.
///
/// Falls back to `root_index` when the path has no usable final component.
pub fn index_name_for(dir: &Path) -> String {
    let base = dir
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("root");
    format!("{base}_index")
}

/// The hash key prefix shared by every record of an index: `<index_name>:`.
pub fn key_prefix(index_name: &str) -> String {
    format!("{index_name}:")
}

/// The key for one chunk: `<index_name>:<file-basename>:<chunk-ordinal>`.
///
/// Files sharing a basename in different directories map to the same keys.
pub fn record_key(index_name: &str, file: &str, chunk_index: usize) -> String {
    let base = Path::new(file).file_name().and_then(|n| n.to_str()).unwrap_or(file);
    format!("{index_name}:{base}:{chunk_index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_name_uses_directory_basename() {
        assert_eq!(index_name_for(Path::new("/home/dev/smart-cli")), "smart-cli_index");
        assert_eq!(index_name_for(Path::new("/")), "root_index");
    }

    #[test]
    fn record_key_uses_file_basename_and_ordinal() {
        assert_eq!(record_key("proj_index", "src/deep/main.go", 3), "proj_index:main.go:3");
        assert!(record_key("proj_index", "a/b.rs", 0).starts_with(&key_prefix("proj_index")));
    }

    #[test]
    fn query_top_k_is_positive() {
        assert_eq!(ChunkQuery::new("q", "idx", 0).top_k, 1);
    }
}
