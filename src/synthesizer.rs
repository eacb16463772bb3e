/// Answer synthesis: grounded prompt, model call, tolerant output parsing.
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::Result;
use crate::llm::LanguageModel;
use crate::retriever::RetrievedChunk;

/// What the model is told to answer when the context does not help.
pub const NOT_FOUND_ANSWER: &str = "I cannot find the answer in the provided context.";

const LOG_PREVIEW_CHARS: usize = 500;

const PROMPT_HEAD: &str = r#"You are an expert coding assistant. Answer the QUESTION using ONLY the CONTEXT below.

Output rules:
1. Reply with a single raw JSON object and nothing else. No prose before or after it, no markdown code fences.
2. The object has exactly two keys:
   - "answer": a plain-text string with the explanation. No markdown.
   - "code_snippets": a list of objects, each with "language" and "code" string keys. Use an empty list when no code is relevant.
3. Escape code for JSON: newlines as \n, quotes as \".
4. Be direct.

If the CONTEXT does not contain the answer, reply with {"answer": "I cannot find the answer in the provided context.", "code_snippets": []}.

CONTEXT:
---
"#;

const PROMPT_BEFORE_QUESTION: &str = "\n---\n\nQUESTION:\n";

const PROMPT_TAIL: &str = "\n\nAnswer:\n";

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").unwrap());
static TRAILING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    #[serde(default)]
    pub language: String,
    pub code: String,
}

/// A structured answer as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub code_snippets: Vec<CodeSnippet>,
}

impl Answer {
    /// The answer used when the model output could not be parsed.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            answer: text.into(),
            code_snippets: Vec::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<CodeSnippet>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<CodeSnippet>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why model output could not be read as an [`Answer`]. Never leaves this
/// module: callers get the raw-text fallback instead.
#[derive(Error, Debug)]
pub(crate) enum AnswerParseError {
    #[error("model returned no output")]
    Empty,

    #[error("output is not a valid answer object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Assemble the prompt from labeled context chunks and the question.
#[must_use]
pub fn build_prompt(question: &str, context: &[RetrievedChunk]) -> String {
    let context = context
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}\n{}", i + 1, r.chunk.source_path(), r.chunk.text))
        .collect::<Vec<_>>()
        .join("\n---\n");
    // Values are inserted once; placeholder-like text inside them stays as is.
    let mut prompt = String::with_capacity(
        PROMPT_HEAD.len() + context.len() + PROMPT_BEFORE_QUESTION.len() + question.len() + PROMPT_TAIL.len(),
    );
    prompt.push_str(PROMPT_HEAD);
    prompt.push_str(&context);
    prompt.push_str(PROMPT_BEFORE_QUESTION);
    prompt.push_str(question);
    prompt.push_str(PROMPT_TAIL);
    prompt
}

/// Remove a leading code fence (with optional language tag) and a trailing
/// fence.
#[must_use]
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = LEADING_FENCE.find(trimmed).map_or(0, |m| m.end());
    let inner = &trimmed[start..];
    let end = TRAILING_FENCE.find(inner).map_or(inner.len(), |m| m.start());
    inner[..end].trim()
}

pub(crate) fn parse_answer(raw: &str) -> std::result::Result<Answer, AnswerParseError> {
    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return Err(AnswerParseError::Empty);
    }
    Ok(serde_json::from_str(cleaned)?)
}

/// Parse model output, falling back to the raw text as the answer.
#[must_use]
pub fn parse_answer_or_fallback(raw: &str) -> Answer {
    match parse_answer(raw) {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Failed to parse model output as JSON ({e}); returning raw text");
            Answer::raw(raw)
        }
    }
}

/// Turns retrieved context and a question into an [`Answer`].
pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn synthesize(&self, question: &str, context: &[RetrievedChunk]) -> Result<Answer> {
        for r in context {
            info!("Source: {}", r.chunk.source_path());
            info!("Content: {}...", r.chunk.preview(LOG_PREVIEW_CHARS));
        }

        let prompt = build_prompt(question, context);
        let raw = self.model.complete(&prompt)?;
        Ok(parse_answer_or_fallback(&raw))
    }
}
