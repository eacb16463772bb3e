/// Embedder trait and shared types for text embedding.
///
/// The index and the retriever only ever see `dyn Embedder`; the concrete
/// provider is picked once at startup.
pub mod mock;
pub mod ollama;

use std::time::Duration;

use thiserror::Error;

use crate::retry::{BodyError, SendError};

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding provider rejected the request: {0}")]
    Rejected(String),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl EmbedderError {
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

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors, one per input, in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Identifies the vector space. Indexes record it at build time so that
    /// queries are never embedded with a different model.
    fn model_id(&self) -> String;
}
