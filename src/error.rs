//! Error taxonomy for the indexing and query pipeline.
use std::path::PathBuf;

use thiserror::Error;

use crate::embedder::EmbedderError;
use crate::llm::LlmError;

/// Errors surfaced by the pipeline.
///
/// Per-file load failures and answer parse failures are recovered where they
/// happen and never reach callers as a `RagError`.
#[derive(Error, Debug)]
pub enum RagError {
    /// Missing or invalid project root, or an invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No index has been persisted at the location.
    #[error("no index found at {}", .location.display())]
    StoreNotFound { location: PathBuf },

    /// The location is already taken by an index; builds never overwrite.
    #[error("an index already exists at {}", .location.display())]
    IndexExists { location: PathBuf },

    /// The directory exists but the build that created it never finished.
    #[error("index at {} is incomplete (interrupted build); remove it to rebuild", .location.display())]
    IncompleteIndex { location: PathBuf },

    /// The persisted vectors were produced by a different embedding setup.
    #[error("index was built with {found}, but {expected} is configured")]
    EmbeddingMismatch { expected: String, found: String },

    #[error("index lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedderError),

    #[error("language model failed: {0}")]
    ModelInvocation(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether a provider gave up waiting on a response.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Embedding(EmbedderError::Timeout(_)) | Self::ModelInvocation(LlmError::Timeout(_))
        )
    }

    /// Whether the failure came from the embedding or language model provider.
    #[must_use]
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::ModelInvocation(_))
    }
}

/// Error for a single file the collector could not read.
#[derive(Error, Debug)]
#[error("failed to load {}: {source}", .path.display())]
pub struct FileLoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub type Result<T> = std::result::Result<T, RagError>;
