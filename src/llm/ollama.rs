/// Language model backed by a local Ollama server (`POST /api/generate`).
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LanguageModel, LlmError};
use crate::config::OllamaConfig;
use crate::retry::{RetryPolicy, read_json, send_with_retry};

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming completions at a fixed, low temperature.
pub struct OllamaModel {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OllamaModel {
    /// Build the HTTP client from the Ollama section of the config.
    ///
    /// Must be called outside of an async runtime.
    pub fn from_config(config: &OllamaConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_secs(config.generate_timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coderag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Unavailable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.host.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            retry: config.retry,
        })
    }
}

impl LanguageModel for OllamaModel {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };
        debug!("Prompting {} ({} chars)", self.model, prompt.chars().count());

        let resp = send_with_retry("ollama-generate", &self.retry, || {
            self.client.post(&self.endpoint).json(&body).send()
        })
        .map_err(|e| LlmError::from_send(e, self.timeout))?;

        let parsed: GenerateResponse =
            read_json(resp).map_err(|e| LlmError::from_body(e, self.timeout))?;
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
