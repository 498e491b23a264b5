//! Prompt assembly and the generation provider seam.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Generation model used when neither the caller nor `SMART_RAG_MODEL` names one.
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";

/// Instructions for answering questions about a codebase from a terminal.
pub const SYSTEM_PROMPT: &str = "\
You are an assistant embedded in a command-line tool. Answer in plain text without Markdown.
Review the code you are shown and point out likely errors.
Explain problems clearly and suggest concrete fixes or improvements.
Suggest shell commands when they help.
Keep answers short, precise and relevant to the question; stay under 700 tokens.";

/// Nearest neighbours retrieved for a file review.
pub const REVIEW_TOP_K: usize = 10;

/// Nearest neighbours retrieved when explaining an error message.
pub const EXPLAIN_TOP_K: usize = 5;

/// How much detail a file review should go into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewDetail {
    Low,
    #[default]
    Medium,
    High,
}

impl ReviewDetail {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewDetail::Low => "low",
            ReviewDetail::Medium => "medium",
            ReviewDetail::High => "high",
        }
    }
}

impl fmt::Display for ReviewDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewDetail {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ReviewDetail::Low),
            "medium" => Ok(ReviewDetail::Medium),
            "high" => Ok(ReviewDetail::High),
            other => Err(RagError::InvalidInput(format!(
                "unknown detail level '{other}', expected low, medium or high"
            ))),
        }
    }
}

/// The question handed to the model when reviewing `path`.
pub fn review_question(path: &str, question: &str, detail: ReviewDetail) -> String {
    format!(
        "Based on the provided code context, please answer this question about the file \
         '{path}': {question}\n\nProvide a {detail} level of detail in your answer."
    )
}

/// The text embedded to find chunks related to an error message.
pub fn error_search_query(error_text: &str) -> String {
    format!("error {error_text} golang programming fix solution")
}

/// The question handed to the model when explaining an error message.
pub fn explain_error_question(error_text: &str) -> String {
    format!(
        "Please explain this programming error and provide a solution:

Error: {error_text}

Please explain:
1. What this error means in simple terms
2. What typically causes this error
3. How to fix it with clear steps and code examples
4. How to prevent it in the future

Keep the explanation clear, practical, and focused on Go programming."
    )
}

/// A text-generation model that answers an assembled prompt.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of the underlying model, for logging.
    fn model_name(&self) -> &str;
}

/// Build the final prompt: optional system text, then the `Context:`,
/// `User question:` and `Instructions:` sections.
pub fn assemble_prompt(system: &str, question: &str, context: &str) -> String {
    let mut prompt = String::with_capacity(system.len() + question.len() + context.len() + 256);
    if !system.is_empty() {
        prompt.push_str(system);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Context:\n");
    prompt.push_str(context);
    prompt.push_str("\n\nUser question:\n");
    prompt.push_str(question);
    prompt.push_str("\n\nInstructions:\n");
    prompt.push_str("- Use only the Context above; do not invent details.\n");
    prompt.push_str("- If the context is insufficient, say so briefly.\n");
    prompt.push_str("- Prefer precise, concise answers; include code when useful.\n");
    prompt
}

/// Run `provider` on `prompt` within `timeout`, returning trimmed text.
///
/// # Errors
///
/// [`RagError::TimeoutError`] on expiry, [`RagError::GenerationError`] when the
/// model returns only whitespace, or whatever the provider reports.
pub async fn generate_with_timeout(
    provider: &dyn GenerationProvider,
    prompt: &str,
    timeout: Duration,
) -> Result<String> {
    let text = tokio::time::timeout(timeout, provider.generate(prompt))
        .await
        .map_err(|_| RagError::TimeoutError { operation: "generate".to_string(), timeout })??;
    let text = text.trim();
    if text.is_empty() {
        return Err(RagError::GenerationError(format!(
            "model '{}' generated no text",
            provider.model_name()
        )));
    }
    Ok(text.to_string())
}

/// Pick the generation model: `requested` if non-blank, else `SMART_RAG_MODEL`,
/// else [`DEFAULT_GENERATION_MODEL`].
pub fn resolve_generation_model(requested: Option<&str>) -> String {
    resolve_model_with(requested, |key| std::env::var(key).ok())
}

fn resolve_model_with(requested: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> String {
    requested
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| {
            lookup("SMART_RAG_MODEL").map(|m| m.trim().to_string()).filter(|m| !m.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string())
}
