//! Embedding provider trait for generating vector embeddings from text.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (Vertex AI, OpenAI, etc.)
/// behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// Providers are shared by every embedding worker and must tolerate
/// concurrent calls.
///
/// # Example
///
/// ```rust,ignore
/// use smart_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    ///
    /// A successful call never returns an empty vector; providers report that
    /// case as [`RagError::EmptyResponseError`].
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The dimensionality this provider is known to produce, if fixed.
    ///
    /// Index dimensions are always taken from the first vector actually
    /// produced, so this is informational.
    fn dimensions(&self) -> Option<usize> {
        None
    }
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }

    fn dimensions(&self) -> Option<usize> {
        (**self).dimensions()
    }
}

/// Bounds every [`embed`](EmbeddingProvider::embed) call of the wrapped
/// provider with a timeout.
///
/// Expiry is reported as [`RagError::TimeoutError`] with operation `"embed"`.
pub struct TimeoutEmbedder<P> {
    inner: P,
    timeout: Duration,
}

impl<P> TimeoutEmbedder<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for TimeoutEmbedder<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::timeout(self.timeout, self.inner.embed(text)).await.map_err(|_| {
            RagError::TimeoutError { operation: "embed".to_string(), timeout: self.timeout }
        })?
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        tokio::time::timeout(self.timeout, self.inner.embed_batch(texts)).await.map_err(|_| {
            RagError::TimeoutError { operation: "embed_batch".to_string(), timeout: self.timeout }
        })?
    }

    fn dimensions(&self) -> Option<usize> {
        self.inner.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct SlowEmbedder {
        delay: Duration,
    }

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_embed_times_out() {
        let embedder = TimeoutEmbedder::new(
            SlowEmbedder { delay: Duration::from_secs(30) },
            Duration::from_secs(20),
        );
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(
            err,
            RagError::TimeoutError { ref operation, timeout }
                if operation == "embed" && timeout == Duration::from_secs(20)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_embed_passes_through() {
        let embedder = TimeoutEmbedder::new(
            Arc::new(SlowEmbedder { delay: Duration::from_millis(10) }),
            Duration::from_secs(20),
        );
        assert_eq!(embedder.embed("abc").await.unwrap(), vec![3.0, 1.0]);
        assert_eq!(
            embedder.embed_batch(&["a", "bb"]).await.unwrap(),
            vec![vec![1.0, 1.0], vec![2.0, 1.0]]
        );
        assert_eq!(embedder.dimensions(), None);
    }
}
