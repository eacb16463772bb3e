/// Scripted language model for tests.
use std::sync::Mutex;

use super::{LanguageModel, LlmError};

/// Replays canned replies in order (the last one repeats) and records every
/// prompt it receives.
pub struct MockModel {
    replies: Vec<String>,
    unavailable: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    #[must_use]
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            unavailable: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model that always fails as if the provider were down.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            replies: Vec::new(),
            unavailable: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LanguageModel for MockModel {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut prompts = self
            .prompts
            .lock()
            .map_err(|e| LlmError::Unavailable(format!("lock poisoned: {e}")))?;
        prompts.push(prompt.to_string());

        if self.unavailable {
            return Err(LlmError::Unavailable("connection refused".into()));
        }

        let idx = (prompts.len() - 1).min(self.replies.len().saturating_sub(1));
        self.replies
            .get(idx)
            .cloned()
            .ok_or_else(|| LlmError::InvalidResponse("no scripted reply".into()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
