/// Language model trait and shared error type.
///
/// The synthesizer sends one fully assembled prompt and gets back raw text;
/// sampling parameters belong to the provider's configuration.
pub mod mock;
pub mod ollama;

use std::time::Duration;

use thiserror::Error;

use crate::retry::{BodyError, SendError};

/// Errors that can occur while invoking a language model.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("language model timed out after {0:?}")]
    Timeout(Duration),

    #[error("language model unavailable: {0}")]
    Unavailable(String),

    #[error("language model rejected the request: {0}")]
    Rejected(String),

    #[error("invalid language model response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub(crate) fn from_send(err: SendError, timeout: Duration) -> Self {
        match err {
            SendError::Timeout => Self::Timeout(timeout),
            SendError::Unavailable { .. } => Self::Unavailable(err.to_string()),
            SendError::Rejected { .. } => Self::Rejected(err.to_string()),
        }
    }

    pub(crate) fn from_body(err: BodyError, timeout: Duration) -> Self {
        match err {
            BodyError::Timeout => Self::Timeout(timeout),
            BodyError::Invalid(msg) => Self::InvalidResponse(msg),
        }
    }
}

/// A text-completion capability: prompt in, raw model output out.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}
