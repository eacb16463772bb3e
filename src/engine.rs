/// Startup (build or load the index) and the per-question pipeline.
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::embedder::Embedder;
use crate::error::Result;
use crate::index::{BuildOptions, Index};
use crate::indexer::{Chunk, Chunker, CollectOptions, collect};
use crate::llm::LanguageModel;
use crate::retriever::Retriever;
use crate::synthesizer::{Answer, Synthesizer};

/// How [`initialize`] obtained the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatus {
    /// An existing index was attached; nothing was embedded.
    Loaded { entries: usize },
    /// The project was collected, chunked and embedded.
    Built { documents: usize, chunks: usize },
}

/// Validate the configuration, then load this project's index or build it.
///
/// Configuration problems surface before anything is written.
pub fn initialize(config: &Config, embedder: Arc<dyn Embedder>) -> Result<(Index, IndexStatus)> {
    config.validate()?;
    let root = config.project_root()?;
    let location = config.index_location();

    if location.exists() {
        let index = Index::load(&location, embedder)?;
        let entries = index.len()?;
        return Ok((index, IndexStatus::Loaded { entries }));
    }

    info!("No index at {}; building from {}", location.display(), root.display());
    let documents = collect(&root, &CollectOptions::from(config))?;
    let chunks = Chunker::new(config.chunking).chunk(&documents);
    let index = Index::build(&chunks, &location, embedder, BuildOptions::from(config))?;

    Ok((
        index,
        IndexStatus::Built {
            documents: documents.len(),
            chunks: chunks.len(),
        },
    ))
}

/// The result of one question.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: Answer,
    pub sources: Vec<Chunk>,
}

/// Answers questions against a ready index. Holds no per-query state, so
/// one engine can serve concurrent questions.
pub struct QueryEngine {
    index: Index,
    retriever: Retriever,
    synthesizer: Synthesizer,
}

impl QueryEngine {
    pub fn new(index: Index, retriever: Retriever, synthesizer: Synthesizer) -> Self {
        Self {
            index,
            retriever,
            synthesizer,
        }
    }

    pub fn from_config(config: &Config, index: Index, model: Arc<dyn LanguageModel>) -> Self {
        Self::new(
            index,
            Retriever::new(config.retrieval),
            Synthesizer::new(model),
        )
    }

    /// Retrieve context for `question` and synthesize an answer from it.
    pub fn ask(&self, question: &str) -> Result<AskResponse> {
        info!("Question: {question}");
        let retrieved = self.retriever.retrieve(&self.index, question)?;
        let answer = self.synthesizer.synthesize(question, &retrieved)?;
        Ok(AskResponse {
            answer,
            sources: retrieved.into_iter().map(|r| r.chunk).collect(),
        })
    }

    /// Whether the index finished building and can be queried.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.index.meta().complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use crate::error::RagError;
    use crate::llm::mock::MockModel;
    use std::fs;
    use std::path::Path;

    fn project(root: &Path) {
        let sources = root.join("Sources");
        fs::create_dir_all(&sources).unwrap();
        fs::write(
            sources.join("AppDelegate.swift"),
            "class AppDelegate {\n    func application() {\n        Database.open(path: \"app.db\")\n    }\n}\n",
        )
        .unwrap();
        fs::write(
            sources.join("Theme.swift"),
            "struct Theme {\n    let primary = Color.blue\n}\n",
        )
        .unwrap();
    }

    fn config(root: &Path, base: &Path) -> Config {
        Config {
            project_path: Some(root.to_string_lossy().into_owned()),
            index_base_dir: base.to_string_lossy().into_owned(),
            show_progress: false,
            ..Config::default()
        }
    }

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(MockEmbedder::new(256))
    }

    #[test]
    fn test_initialize_builds_then_loads() {
        let root = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        project(root.path());
        let config = config(root.path(), base.path());

        let (index, status) = initialize(&config, embedder()).unwrap();
        assert_eq!(
            status,
            IndexStatus::Built {
                documents: 2,
                chunks: 2
            }
        );
        assert_eq!(index.location(), config.index_location());
        drop(index);

        let (_, status) = initialize(&config, embedder()).unwrap();
        assert_eq!(status, IndexStatus::Loaded { entries: 2 });
    }

    #[test]
    fn test_unset_root_fails_before_writing() {
        let base = tempfile::tempdir().unwrap();
        let config = Config {
            index_base_dir: base.path().join("db").to_string_lossy().into_owned(),
            ..Config::default()
        };
        let err = initialize(&config, embedder()).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(!base.path().join("db").exists());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let root = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        let mut config = config(root.path(), base.path());
        config.chunking.chunk_overlap = 5000;
        assert!(matches!(
            initialize(&config, embedder()),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_failed_first_build_is_retried_on_next_start() {
        let root = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        project(root.path());
        let mut config = config(root.path(), base.path());
        config.batch_size = 1;

        let provider_down: Arc<dyn Embedder> = Arc::new(MockEmbedder::failing_from_batch(256, 1));
        let err = initialize(&config, provider_down).unwrap_err();
        assert!(err.is_provider_error(), "got {err:?}");
        assert!(!config.index_location().exists());

        let (_, status) = initialize(&config, embedder()).unwrap();
        assert_eq!(
            status,
            IndexStatus::Built {
                documents: 2,
                chunks: 2
            }
        );
    }

    #[test]
    fn test_ask_returns_answer_and_sources() {
        let root = tempfile::tempdir().unwrap();
        let base = tempfile::tempdir().unwrap();
        project(root.path());
        let config = config(root.path(), base.path());
        let (index, _) = initialize(&config, embedder()).unwrap();

        let model = Arc::new(MockModel::new([
            "```json\n{\"answer\": \"In AppDelegate.application()\", \"code_snippets\": [{\"language\": \"swift\", \"code\": \"Database.open(path: \\\"app.db\\\")\"}]}\n```",
        ]));
        let engine = QueryEngine::from_config(&config, index, model.clone());
        assert!(engine.is_ready());

        let response = engine.ask("Where does AppDelegate open the Database?").unwrap();
        assert_eq!(response.answer.answer, "In AppDelegate.application()");
        assert_eq!(response.answer.code_snippets.len(), 1);
        assert_eq!(response.sources.len(), 2);
        assert!(response.sources[0].source_path().ends_with("AppDelegate.swift"));
        assert!(model.prompts()[0].contains("Database.open"));
    }
}
