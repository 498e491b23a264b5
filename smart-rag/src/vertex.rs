//! Vertex AI providers: text embeddings via `:predict` and Gemini generation
//! via `:generateContent`.
//!
//! This module is only available when the `vertex` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::prompt::{GenerationProvider, resolve_generation_model};

/// The default Vertex AI text embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-005";

const PROVIDER: &str = "Vertex";

/// An [`EmbeddingProvider`] backed by a Vertex AI publisher embedding model.
///
/// # Configuration
///
/// - `project` / `location` – from the constructor or `GCP_PROJECT_ID` / `GCP_LOCATION`.
/// - `access_token` – an OAuth bearer token, or `GOOGLE_ACCESS_TOKEN`.
/// - `model` – defaults to `text-embedding-005`; `gemini-embedding-001` also works.
///
/// # Example
///
/// ```rust,ignore
/// use smart_rag::vertex::VertexEmbeddingProvider;
///
/// let provider = VertexEmbeddingProvider::from_env()?.with_model("gemini-embedding-001");
/// let embedding = provider.embed("how are chunks keyed?").await?;
/// ```
pub struct VertexEmbeddingProvider {
    client: reqwest::Client,
    project: String,
    location: String,
    access_token: String,
    model: String,
    base_url: Option<String>,
}

impl VertexEmbeddingProvider {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        let (project, location, access_token) =
            (project.into(), location.into(), access_token.into());
        for (name, value) in
            [("project", &project), ("location", &location), ("access token", &access_token)]
        {
            if value.trim().is_empty() {
                return Err(RagError::ConfigError(format!("Vertex {name} must not be empty")));
            }
        }
        Ok(Self {
            client: reqwest::Client::new(),
            project,
            location,
            access_token,
            model: DEFAULT_MODEL.into(),
            base_url: None,
        })
    }

    /// Create a provider from `GCP_PROJECT_ID`, `GCP_LOCATION` and `GOOGLE_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let var = |key: &str| {
            std::env::var(key)
                .map_err(|_| RagError::ConfigError(format!("{key} environment variable not set")))
        };
        Self::new(var("GCP_PROJECT_ID")?, var("GCP_LOCATION")?, var("GOOGLE_ACCESS_TOKEN")?)
    }

    /// Set the model name (e.g. `gemini-embedding-001`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send requests to `base_url` instead of the regional Vertex endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let base = match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        format!(
            "{base}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.project, self.location, self.model
        )
    }

    fn provider_error(message: impl Into<String>) -> RagError {
        RagError::ProviderError { provider: PROVIDER.into(), message: message.into() }
    }
}

// ── Vertex API request/response types ──

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
}

#[derive(Serialize)]
struct Instance<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull `embeddings.values` out of one prediction.
fn prediction_values(prediction: &serde_json::Value) -> Result<Vec<f32>> {
    let values = prediction
        .get("embeddings")
        .and_then(|e| e.get("values"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            RagError::ParseError("Vertex prediction has no embeddings.values list".into())
        })?;
    values
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                RagError::ParseError(format!("non-numeric embedding component: {v}"))
            })
        })
        .collect()
}

fn parse_predictions(response: PredictResponse) -> Result<Vec<Vec<f32>>> {
    if response.predictions.is_empty() {
        return Err(RagError::EmptyResponseError { provider: PROVIDER.into() });
    }
    response.predictions.iter().map(prediction_values).collect()
}

#[async_trait]
impl EmbeddingProvider for VertexEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");
        let vector = self
            .embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::EmptyResponseError { provider: PROVIDER.into() })?;
        if vector.is_empty() {
            return Err(RagError::EmptyResponseError { provider: PROVIDER.into() });
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let body = PredictRequest {
            instances: texts.iter().map(|content| Instance { content }).collect(),
        };
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                Self::provider_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(provider = PROVIDER, %status, "API error");
            return Err(Self::provider_error(format!("API returned {status}: {detail}")));
        }

        let parsed: PredictResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::ParseError(format!("Vertex response: {e}"))
        })?;
        parse_predictions(parsed)
    }
}

// ── Generation ──

/// A [`GenerationProvider`] backed by a Gemini model's `:generateContent` on Vertex AI.
///
/// Sampling is fixed at temperature 0.2, top-p 0.9, top-k 15 with at most 700
/// output tokens.
pub struct VertexGenerationProvider {
    client: reqwest::Client,
    project: String,
    location: String,
    access_token: String,
    model: String,
    base_url: Option<String>,
}

impl VertexGenerationProvider {
    /// Create a generator for `model`; see [`resolve_generation_model`].
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        access_token: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let embedder = VertexEmbeddingProvider::new(project, location, access_token)?;
        Ok(Self {
            client: embedder.client,
            project: embedder.project,
            location: embedder.location,
            access_token: embedder.access_token,
            model: model.into(),
            base_url: None,
        })
    }

    /// Create a generator from the `GCP_*` / `GOOGLE_ACCESS_TOKEN` variables,
    /// using the model resolved from `SMART_RAG_MODEL`.
    pub fn from_env() -> Result<Self> {
        let embedder = VertexEmbeddingProvider::from_env()?;
        Ok(Self {
            client: embedder.client,
            project: embedder.project,
            location: embedder.location,
            access_token: embedder.access_token,
            model: resolve_generation_model(None),
            base_url: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn endpoint(&self) -> String {
        let base = match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        format!(
            "{base}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.project, self.location, self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: f64,
    max_output_tokens: u32,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content { role: "user", parts: vec![TextPart { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 15.0,
                max_output_tokens: 700,
            },
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(response: &serde_json::Value) -> Result<String> {
    let parts = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| RagError::GenerationError("response has no candidate content".into()))?;
    Ok(parts.iter().filter_map(|p| p.get("text").and_then(|t| t.as_str())).collect())
}

#[async_trait]
impl GenerationProvider for VertexGenerationProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.access_token)
            .json(&GenerateRequest::new(prompt))
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                VertexEmbeddingProvider::provider_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(provider = PROVIDER, %status, "API error");
            return Err(VertexEmbeddingProvider::provider_error(format!(
                "API returned {status}: {detail}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::ParseError(format!("Vertex response: {e}")))?;
        candidate_text(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> PredictResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn endpoint_targets_regional_predict() {
        let provider = VertexEmbeddingProvider::new("proj", "us-central1", "tok").unwrap();
        assert_eq!(
            provider.endpoint(),
            concat!(
                "https://us-central1-aiplatform.googleapis.com/v1/projects/proj/",
                "locations/us-central1/publishers/google/models/text-embedding-005:predict"
            )
        );
        let provider =
            provider.with_model("gemini-embedding-001").with_base_url("http://localhost:9000/");
        assert!(provider.endpoint().starts_with("http://localhost:9000/v1/projects/proj/"));
        assert!(provider.endpoint().ends_with("gemini-embedding-001:predict"));
    }

    #[test]
    fn request_body_wraps_content_in_instances() {
        let body = PredictRequest { instances: vec![Instance { content: "fn main" }] };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"instances": [{"content": "fn main"}]})
        );
    }

    #[test]
    fn parses_prediction_values() {
        let parsed = parse_predictions(response(json!({
            "predictions": [{
                "embeddings": {"values": [0.5, -1.0, 2], "statistics": {"token_count": 3}}
            }]
        })))
        .unwrap();
        assert_eq!(parsed, vec![vec![0.5, -1.0, 2.0]]);
    }

    #[test]
    fn zero_predictions_is_empty_response() {
        let err = parse_predictions(response(json!({"predictions": []}))).unwrap_err();
        assert!(matches!(err, RagError::EmptyResponseError { .. }));
        let err = parse_predictions(response(json!({}))).unwrap_err();
        assert!(matches!(err, RagError::EmptyResponseError { .. }));
    }

    #[test]
    fn missing_values_is_parse_error() {
        let err =
            parse_predictions(response(json!({"predictions": [{"embeddings": {}}]}))).unwrap_err();
        assert!(matches!(err, RagError::ParseError(_)));
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert!(matches!(
            VertexEmbeddingProvider::new("proj", "", "tok"),
            Err(RagError::ConfigError(_))
        ));
    }

    #[test]
    fn generate_request_carries_sampling_config() {
        assert_eq!(
            serde_json::to_value(GenerateRequest::new("hi")).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "generationConfig": {
                    "temperature": 0.2,
                    "topP": 0.9,
                    "topK": 15.0,
                    "maxOutputTokens": 700
                }
            })
        );
    }

    #[test]
    fn candidate_parts_are_concatenated() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "Use "}, {"text": "retries."}]}}]
        });
        assert_eq!(candidate_text(&body).unwrap(), "Use retries.");
        assert!(matches!(
            candidate_text(&json!({"candidates": []})),
            Err(RagError::GenerationError(_))
        ));
    }

    #[test]
    fn generator_endpoint_uses_generate_content() {
        let generator =
            VertexGenerationProvider::new("proj", "europe-west4", "tok", "gemini-2.5-flash")
                .unwrap();
        assert!(generator.endpoint().ends_with("/models/gemini-2.5-flash:generateContent"));
        assert_eq!(generator.model_name(), "gemini-2.5-flash");
    }
}
