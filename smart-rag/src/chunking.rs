//! Fixed-size, overlapping text chunking.
//!
//! Windows are measured in Unicode code points, never bytes, so a multi-byte
//! character is never split. The [`Chunker`] trait lets the pipeline take any
//! splitting strategy; [`FixedSizeChunker`] is the one used for indexing.

use std::path::Path;

use crate::error::{RagError, Result};

/// Chunk size used when a size of zero is requested.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// A strategy for splitting text into ordered chunks.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks. Returns an empty `Vec` for empty text.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits text into windows of `chunk_size` code points, consecutive windows
/// sharing `chunk_overlap` code points.
///
/// # Example
///
/// ```rust
/// use smart_rag::chunking::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(4, 1);
/// assert_eq!(chunker.split("abcdefg"), vec!["abcd", "defg"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`. A `chunk_size` of zero means [`DEFAULT_CHUNK_SIZE`].
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size };
        Self { chunk_size, chunk_overlap }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, 0)
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_text(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Split `text` into code-point windows of `size` with `overlap` shared code points.
///
/// After each window ending at `end` the next one starts at `end - overlap`,
/// clamped so that it always lies strictly after the previous start. The last
/// window ends exactly at the end of the text.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = if size == 0 { DEFAULT_CHUNK_SIZE } else { size };

    // Byte offset of every code point, plus the end of the text.
    let bounds: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end == len {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

/// Read a file as UTF-8 text.
///
/// Returns `Ok(None)` for content that is not valid UTF-8, which callers treat
/// as nothing to index.
///
/// # Errors
///
/// Returns [`RagError::IoError`] if the file cannot be read.
pub async fn read_text(path: &Path) -> Result<Option<String>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| RagError::io(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            tracing::debug!(path = %path.display(), "skipping non-UTF-8 file");
            Ok(None)
        }
    }
}

/// Read a file and split its contents with [`split_text`].
///
/// Files that are not valid UTF-8 yield an empty result rather than an error.
pub async fn split_file(path: &Path, size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(read_text(path).await?.map(|text| split_text(&text, size, overlap)).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(chunks: &[String], overlap: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut pos = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                pos -= overlap;
            }
            out.push(pos);
            pos += chunk.chars().count();
        }
        out
    }

    #[test]
    fn two_thousand_code_points_make_three_chunks() {
        let text: String = (0..2000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = split_text(&text, 800, 50);

        assert_eq!(chunks.len(), 3);
        assert_eq!(offsets(&chunks, 50), vec![0, 750, 1500]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 800));
        assert_eq!(chunks[2].chars().count(), 500);
        assert_eq!(chunks[1], text[750..1550]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 800, 50).is_empty());
        assert!(split_text("", 0, 0).is_empty());
    }

    #[test]
    fn zero_size_uses_default() {
        let text = "x".repeat(1000);
        let chunks = split_text(&text, 0, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), DEFAULT_CHUNK_SIZE);
        assert_eq!(FixedSizeChunker::new(0, 10).chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn multibyte_characters_are_never_split() {
        let text = "héllo wörld ✓ 日本語テキスト 🦀🦀🦀";
        let chunks = split_text(text, 3, 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(chunks.last().map(|c| c.ends_with('🦀')), Some(true));
        assert_eq!(chunks[0], "hél");
        assert_eq!(chunks[1], "llo");
    }

    #[test]
    fn overlap_not_smaller_than_size_still_terminates() {
        let chunks = split_text("abcdefghij", 3, 5);
        assert_eq!(chunks.first().map(String::as_str), Some("abc"));
        assert_eq!(chunks.last().map(String::as_str), Some("hij"));
        assert_eq!(chunks.len(), 8);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(split_text("fn main() {}", 800, 50), vec!["fn main() {}".to_string()]);
    }

    #[tokio::test]
    async fn split_file_skips_binary_content() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("blob.txt");
        std::fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(split_file(&binary, 10, 0).await.unwrap().is_empty());

        let text = dir.path().join("notes.md");
        std::fs::write(&text, "abcdef").unwrap();
        assert_eq!(split_file(&text, 4, 2).await.unwrap(), vec!["abcd", "cdef"]);
    }

    #[tokio::test]
    async fn split_file_reports_missing_file() {
        let err = split_file(Path::new("/definitely/not/here.go"), 10, 0).await.unwrap_err();
        assert!(matches!(err, RagError::IoError { .. }));
    }
}
