//! Text encoder capability and its HTTP implementation.
//!
//! The encoder is injected once when the engine is built. [`Encoder::Disabled`]
//! selects keyword search; [`Encoder::Enabled`] selects semantic search.
//! [`HttpEncoder`] talks to any OpenAI-compatible `/embeddings` endpoint.

use semgraph_core::{EmbeddingConfig, ScgError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Turns text into fixed-dimension vectors.
pub trait TextEncoder: Send + Sync {
    /// Encode many texts. Returns vectors in input order.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Embedding`] if encoding fails.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScgError>;

    /// Encode a single query text.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Embedding`] if encoding fails.
    fn encode_one(&self, text: &str) -> Result<Vec<f32>, ScgError> {
        self.encode_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| ScgError::Embedding("encoder returned no vector".into()))
    }
}

/// Encoder chosen at construction time.
///
/// # Examples
///
/// ```
/// use semgraph_lens::encoder::Encoder;
///
/// let encoder = Encoder::Disabled;
/// assert!(!encoder.is_enabled());
/// ```
pub enum Encoder {
    /// No encoder configured; search runs in keyword mode.
    Disabled,
    /// A real encoder; search runs in semantic mode.
    Enabled(Box<dyn TextEncoder>),
}

impl Encoder {
    /// Wrap a concrete encoder.
    pub fn enabled(encoder: impl TextEncoder + 'static) -> Self {
        Encoder::Enabled(Box::new(encoder))
    }

    /// Build the encoder described by `config`.
    ///
    /// `provider = "none"` yields [`Encoder::Disabled`].
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Config`] for an unknown provider or a missing API
    /// key.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ScgError> {
        if !config.is_enabled() {
            return Ok(Encoder::Disabled);
        }
        match config.provider.to_lowercase().as_str() {
            "openai" => Ok(Encoder::enabled(HttpEncoder::with_config(config)?)),
            other => Err(ScgError::Config(format!(
                "unknown embedding provider '{other}': expected \"none\" or \"openai\""
            ))),
        }
    }

    /// Whether an encoder is present.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Encoder::Enabled(_))
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoder::Disabled => f.write_str("Encoder::Disabled"),
            Encoder::Enabled(_) => f.write_str("Encoder::Enabled(..)"),
        }
    }
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDataItem>,
}

#[derive(Deserialize)]
struct EmbedDataItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Blocking client for an OpenAI-compatible embeddings endpoint.
///
/// # Examples
///
/// ```
/// use semgraph_lens::encoder::HttpEncoder;
///
/// let encoder = HttpEncoder::new("test-key", "text-embedding-3-small");
/// assert_eq!(encoder.model(), "text-embedding-3-small");
/// ```
pub struct HttpEncoder {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl std::fmt::Debug for HttpEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEncoder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl HttpEncoder {
    /// Create a client for the public OpenAI endpoint.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key: Some(api_key.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            batch_size: 64,
        }
    }

    /// Create a client from an [`EmbeddingConfig`].
    ///
    /// Falls back to the `OPENAI_API_KEY` env var if no key is configured.
    /// A key is only required for the default endpoint; self-hosted
    /// endpoints set through `base_url` may run without one.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Config`] if the default endpoint is used without
    /// an API key.
    pub fn with_config(config: &EmbeddingConfig) -> Result<Self, ScgError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok());
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if api_key.is_none() && base_url == DEFAULT_BASE_URL {
            return Err(ScgError::Config(format!(
                "embedding API key not found: set embedding.api_key in .semgraph.toml or {API_KEY_ENV_VAR} env var"
            )));
        }

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
        })
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn post(&self, input: &[String]) -> Result<Vec<Vec<f32>>, ScgError> {
        let request = EmbedRequest {
            model: &self.model,
            input,
        };

        let mut builder = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .map_err(|e| ScgError::Embedding(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(ScgError::Embedding(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response
            .json()
            .map_err(|e| ScgError::Embedding(format!("failed to parse response: {e}")))?;

        into_vectors(body, input.len())
    }
}

impl TextEncoder for HttpEncoder {
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScgError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!("encoding batch {} ({} texts)", i + 1, batch.len());
            all.extend(self.post(batch)?);
        }
        Ok(all)
    }
}

/// Order response items by their `index` and check the count.
fn into_vectors(response: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>, ScgError> {
    let mut items = response.data;
    if items.len() != expected {
        return Err(ScgError::Embedding(format!(
            "expected {expected} embeddings, got {}",
            items.len()
        )));
    }
    items.sort_by_key(|item| item.index);
    Ok(items.into_iter().map(|item| item.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_format_is_correct() {
        let texts = vec!["CLASS: LruCache".to_string(), "METHOD: get".to_string()];
        let request = EmbedRequest {
            model: "text-embedding-3-small",
            input: &texts,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn response_items_are_reordered_by_index() {
        let json = r#"{
            "data": [
                {"index": 1, "embedding": [0.4, 0.5]},
                {"index": 0, "embedding": [0.1, 0.2]}
            ]
        }"#;
        let response: EmbedResponse = serde_json::from_str(json).unwrap();
        let vectors = into_vectors(response, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);
    }

    #[test]
    fn response_count_mismatch_is_an_error() {
        let json = r#"{"data": [{"embedding": [0.1]}]}"#;
        let response: EmbedResponse = serde_json::from_str(json).unwrap();
        let err = into_vectors(response, 2).unwrap_err();
        assert!(err.to_string().contains("expected 2 embeddings"));
    }

    #[test]
    fn disabled_provider_yields_disabled_encoder() {
        let encoder = Encoder::from_config(&EmbeddingConfig::default()).unwrap();
        assert!(!encoder.is_enabled());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = EmbeddingConfig {
            provider: "voyage".into(),
            ..EmbeddingConfig::default()
        };
        let err = Encoder::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("unknown embedding provider"));
    }

    #[test]
    fn self_hosted_endpoint_needs_no_key() {
        let config = EmbeddingConfig {
            provider: "openai".into(),
            base_url: Some("http://localhost:11434/v1/".into()),
            batch_size: 0,
            ..EmbeddingConfig::default()
        };
        let encoder = HttpEncoder::with_config(&config).unwrap();
        assert_eq!(encoder.base_url, "http://localhost:11434/v1");
        assert_eq!(encoder.batch_size, 1);
    }

    #[test]
    fn explicit_key_is_used() {
        let config = EmbeddingConfig {
            provider: "openai".into(),
            api_key: Some("sk-test".into()),
            ..EmbeddingConfig::default()
        };
        let encoder = HttpEncoder::with_config(&config).unwrap();
        assert_eq!(encoder.api_key.as_deref(), Some("sk-test"));
        assert_eq!(encoder.model(), "text-embedding-3-small");
    }

    #[test]
    fn empty_batch_makes_no_request() {
        let encoder = HttpEncoder::new("key", "model");
        assert!(encoder.encode_batch(&[]).unwrap().is_empty());
    }
}
