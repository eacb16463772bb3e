/// Embedder backed by a local Ollama server (`POST /api/embed`).
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::config::OllamaConfig;
use crate::retry::{RetryPolicy, read_json, send_with_retry};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Calls Ollama's embedding endpoint once per batch.
pub struct OllamaEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OllamaEmbedder {
    /// Build the HTTP client from the Ollama section of the config.
    ///
    /// Must be called outside of an async runtime: the blocking client owns
    /// its own.
    pub fn from_config(config: &OllamaConfig) -> Result<Self, EmbedderError> {
        let timeout = Duration::from_secs(config.embed_timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coderag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmbedderError::Unavailable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", config.host.trim_end_matches('/')),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
            timeout,
            retry: config.retry,
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| EmbedderError::InvalidResponse("no embedding returned".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let resp = send_with_retry("ollama-embed", &self.retry, || {
            self.client.post(&self.endpoint).json(&body).send()
        })
        .map_err(|e| EmbedderError::from_send(e, self.timeout))?;

        let parsed: EmbedResponse =
            read_json(resp).map_err(|e| EmbedderError::from_body(e, self.timeout))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbedderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        if let Some(bad) = parsed
            .embeddings
            .iter()
            .find(|v| v.len() != self.dimensions)
        {
            return Err(EmbedderError::InvalidResponse(format!(
                "{} returned {}-dimensional vectors, configured for {}",
                self.model,
                bad.len(),
                self.dimensions
            )));
        }

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> String {
        format!("ollama:{}/{}", self.model, self.dimensions)
    }
}
