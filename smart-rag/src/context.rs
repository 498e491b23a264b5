//! Packing retrieved chunks into a bounded context block.

use crate::document::Chunk;

/// Separator placed between chunks in the assembled context.
pub const SEPARATOR: &str = "\n\n";

/// Default context budget in code points.
pub const DEFAULT_CHAR_BUDGET: usize = 10_000;

/// Assemble `chunks` into one context string of at most `char_budget` code points.
///
/// Chunks are taken closest first (stable, so equal scores keep their input
/// order; a NaN score ranks last). Each chunk's text is trimmed and appended
/// whole, preceded by [`SEPARATOR`] unless it is the first; chunks that are
/// empty after trimming are skipped. The first chunk that does not fit ends the assembly, so no
/// chunk is ever truncated.
///
/// # Example
///
/// ```rust
/// use smart_rag::Chunk;
/// use smart_rag::context::assemble;
///
/// let chunks = vec![
///     Chunk { text: "second".into(), score: 0.12, ..Default::default() },
///     Chunk { text: "first".into(), score: 0.05, ..Default::default() },
/// ];
/// assert_eq!(assemble(&chunks, 100), "first\n\nsecond");
/// ```
pub fn assemble(chunks: &[Chunk], char_budget: usize) -> String {
    let mut ranked: Vec<&Chunk> = chunks.iter().collect();
    ranked.sort_by(|a, b| rank_key(a.score).total_cmp(&rank_key(b.score)));

    let separator_len = SEPARATOR.chars().count();
    let mut out = String::new();
    let mut used = 0;
    for chunk in ranked {
        let text = chunk.text.trim();
        if text.is_empty() {
            continue;
        }
        let extra = if used == 0 { 0 } else { separator_len };
        let len = text.chars().count();
        if used + extra + len > char_budget {
            break;
        }
        if extra > 0 {
            out.push_str(SEPARATOR);
        }
        out.push_str(text);
        used += extra + len;
    }
    out
}

/// NaN sorts after every real distance.
fn rank_key(score: f64) -> f64 {
    if score.is_nan() { f64::INFINITY } else { score }
}
