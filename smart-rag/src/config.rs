//! Configuration for the indexing and retrieval pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::error::{RagError, Result};

/// Directories that are never descended into during a walk.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "venv",
    ".venv",
    "__pycache__",
    "target",
    "dist",
    "build",
    ".cache",
    "vendor",
];

/// File extensions (without the dot) eligible for indexing.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "go", "py", "js", "ts", "tsx", "jsx", "json", "md", "txt", "yaml", "yml", "rs", "toml", "c",
    "h", "cpp", "hpp", "java", "kt", "rb", "sh", "sql", "html", "css",
];

/// Configuration parameters for indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in code points.
    pub chunk_size: usize,
    /// Number of code points shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of nearest neighbours requested per query.
    pub top_k: usize,
    /// Maximum length, in code points, of the assembled context.
    pub char_budget: usize,
    /// Explicit index name. When unset the name is derived from the indexed directory.
    pub index_name: Option<String>,
    /// Workers reading and splitting files.
    pub file_workers: usize,
    /// Workers embedding and storing chunks.
    pub embed_workers: usize,
    /// Workers running retrieval queries.
    pub retrieval_workers: usize,
    /// Capacity of each bounded queue between pipeline stages.
    pub queue_capacity: usize,
    /// Per-call budget for embedding requests.
    #[serde(with = "duration_secs")]
    pub embed_timeout: Duration,
    /// Per-call budget for generation requests.
    #[serde(with = "duration_secs")]
    pub generate_timeout: Duration,
    /// Directory names that are skipped entirely.
    pub skip_dirs: Vec<String>,
    /// File extensions (without the dot) that are indexed.
    pub extensions: Vec<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: 50,
            top_k: 5,
            char_budget: 10_000,
            index_name: None,
            file_workers: 8,
            embed_workers: 10,
            retrieval_workers: 7,
            queue_capacity: 64,
            embed_timeout: Duration::from_secs(20),
            generate_timeout: Duration::from_secs(60),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from defaults overridden by `SMART_RAG_*` environment variables.
    ///
    /// Recognised variables: `SMART_RAG_CHUNK_SIZE`, `SMART_RAG_CHUNK_OVERLAP`,
    /// `SMART_RAG_TOP_K`, `SMART_RAG_CHAR_BUDGET` and `SMART_RAG_INDEX`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a numeric variable does not parse or
    /// the resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(size) = parse_var(&lookup, "SMART_RAG_CHUNK_SIZE")? {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = parse_var(&lookup, "SMART_RAG_CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(top_k) = parse_var(&lookup, "SMART_RAG_TOP_K")? {
            builder = builder.top_k(top_k);
        }
        if let Some(budget) = parse_var(&lookup, "SMART_RAG_CHAR_BUDGET")? {
            builder = builder.char_budget(budget);
        }
        if let Some(name) = lookup("SMART_RAG_INDEX").filter(|n| !n.trim().is_empty()) {
            builder = builder.index_name(name.trim());
        }
        builder.build()
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| RagError::ConfigError(format!("{key}={raw:?} is not a number: {e}"))),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in code points.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in code points.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of nearest neighbours requested per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the context budget in code points.
    pub fn char_budget(mut self, budget: usize) -> Self {
        self.config.char_budget = budget;
        self
    }

    /// Use a fixed index name instead of deriving it from the directory.
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_name = Some(name.into());
        self
    }

    /// Set the number of file-level workers.
    pub fn file_workers(mut self, workers: usize) -> Self {
        self.config.file_workers = workers;
        self
    }

    /// Set the number of embedding workers.
    pub fn embed_workers(mut self, workers: usize) -> Self {
        self.config.embed_workers = workers;
        self
    }

    /// Set the number of retrieval workers.
    pub fn retrieval_workers(mut self, workers: usize) -> Self {
        self.config.retrieval_workers = workers;
        self
    }

    /// Set the capacity of the queues between pipeline stages.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the per-call embedding timeout.
    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout = timeout;
        self
    }

    /// Set the per-call generation timeout.
    pub fn generate_timeout(mut self, timeout: Duration) -> Self {
        self.config.generate_timeout = timeout;
        self
    }

    /// Replace the directory deny-list.
    pub fn skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.skip_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the extension allow-list. Leading dots are stripped.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - any worker count or the queue capacity is zero
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        for (name, value) in [
            ("file_workers", config.file_workers),
            ("embed_workers", config.embed_workers),
            ("retrieval_workers", config.retrieval_workers),
            ("queue_capacity", config.queue_capacity),
        ] {
            if value == 0 {
                return Err(RagError::ConfigError(format!("{name} must be greater than zero")));
            }
        }
        Ok(config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom(
                "duration must be a non-negative number of seconds",
            ));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_pipeline_tuning() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.file_workers, 8);
        assert_eq!(config.embed_workers, 10);
        assert_eq!(config.retrieval_workers, 7);
        assert_eq!(config.embed_timeout, Duration::from_secs(20));
        assert_eq!(config.generate_timeout, Duration::from_secs(60));
        assert!(config.skip_dirs.iter().any(|d| d == ".git"));
        assert!(config.extensions.iter().any(|e| e == "go"));
    }

    #[test]
    fn builder_rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn builder_rejects_zero_workers() {
        let err = RagConfig::builder().retrieval_workers(0).build().unwrap_err();
        assert!(err.to_string().contains("retrieval_workers"));
    }

    #[test]
    fn builder_strips_extension_dots() {
        let config = RagConfig::builder().extensions([".rs", "md"]).build().unwrap();
        assert_eq!(config.extensions, vec!["rs".to_string(), "md".to_string()]);
    }

    #[test]
    fn env_overrides_are_applied() {
        let vars: HashMap<&str, &str> = [
            ("SMART_RAG_CHUNK_SIZE", "400"),
            ("SMART_RAG_CHUNK_OVERLAP", "40"),
            ("SMART_RAG_INDEX", " notes_index "),
        ]
        .into_iter()
        .collect();
        let config = RagConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.chunk_overlap, 40);
        assert_eq!(config.index_name.as_deref(), Some("notes_index"));
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn env_rejects_garbage_numbers() {
        let err = RagConfig::from_lookup(|k| (k == "SMART_RAG_TOP_K").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SMART_RAG_TOP_K"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RagConfig::builder().top_k(9).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: RagConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
