/// HTTP shim over the query engine (`axum`).
///
/// Provides `AppState` (shared state) and `serve` (startup logic).
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::engine::{AskResponse, QueryEngine};
use crate::synthesizer::CodeSnippet;

mod handlers;
mod router;

pub use router::build_router;

const SOURCE_PREVIEW_CHARS: usize = 300;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
}

#[derive(Debug, Serialize)]
pub struct SourceView {
    pub file: String,
    pub content_preview: String,
}

/// The JSON body returned by `POST /ask`.
#[derive(Debug, Serialize)]
pub struct AskReply {
    pub answer: String,
    pub code_snippets: Vec<CodeSnippet>,
    pub sources: Vec<SourceView>,
}

impl From<AskResponse> for AskReply {
    fn from(response: AskResponse) -> Self {
        let sources = response
            .sources
            .iter()
            .map(|chunk| SourceView {
                file: chunk.source_path().to_string(),
                content_preview: format!("{}...", chunk.preview(SOURCE_PREVIEW_CHARS)),
            })
            .collect();
        Self {
            answer: response.answer.answer,
            code_snippets: response.answer.code_snippets,
            sources,
        }
    }
}

/// Serve HTTP on `addr` until Ctrl-C.
pub async fn serve(engine: Arc<QueryEngine>, addr: SocketAddr) -> Result<()> {
    let router = build_router(AppState { engine });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await
        .context("HTTP server encountered an error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Chunk;
    use crate::synthesizer::Answer;

    #[test]
    fn test_reply_previews_sources() {
        let long = "x".repeat(400);
        let reply = AskReply::from(AskResponse {
            answer: Answer::raw("ok"),
            sources: vec![
                Chunk::new(long, "/p/Long.swift"),
                Chunk::new("short", "/p/Short.swift"),
            ],
        });
        assert_eq!(reply.answer, "ok");
        assert_eq!(reply.sources[0].file, "/p/Long.swift");
        assert_eq!(reply.sources[0].content_preview.chars().count(), 303);
        assert!(reply.sources[0].content_preview.ends_with("..."));
        assert_eq!(reply.sources[1].content_preview, "short...");
    }
}
