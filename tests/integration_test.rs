/// End-to-end integration tests for the coderag pipeline.
///
/// Tests the complete flow:
///   Config → Collect → Chunk → Build/Load index → Retrieve → Synthesize
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use coderag::config::Config;
use coderag::embedder::Embedder;
use coderag::embedder::mock::MockEmbedder;
use coderag::engine::{IndexStatus, QueryEngine, initialize};
use coderag::error::RagError;
use coderag::indexer::{Chunker, CollectOptions, collect};
use coderag::llm::mock::MockModel;
use tempfile::tempdir;

const REPLY: &str = r#"```json
{"answer": "AppDelegate opens it on launch.", "code_snippets": [{"language": "swift", "code": "Database.open(path: \"app.db\")"}]}
```"#;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// A small iOS-style project with vendored code that must stay out of the index.
fn sample_project(root: &Path) {
    write(
        root,
        "App/AppDelegate.swift",
        "import UIKit\n\nclass AppDelegate: UIResponder {\n    func application() -> Bool {\n        Database.open(path: \"app.db\")\n        return true\n    }\n}\n",
    );
    write(
        root,
        "App/Theme.swift",
        "struct Theme {\n    let primary = Color.blue\n    let accent = Color.orange\n}\n",
    );
    write(
        root,
        "App/Network/Client.swift",
        "final class Client {\n    func fetch(url: URL) async throws -> Data {\n        try await session.data(from: url).0\n    }\n}\n",
    );
    write(root, "README.md", "# Sample\n\nNot indexed.\n");
    write(
        root,
        "Pods/Alamofire/Session.swift",
        "open class Session { func open(path: String) { Database.open(path: path) } }\n",
    );
    write(
        root,
        "Externals/northstar/Star.swift",
        "struct Star { let database = Database.open(path: \"star.db\") }\n",
    );
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

fn source_set(engine: &QueryEngine, question: &str) -> BTreeSet<String> {
    engine
        .ask(question)
        .unwrap()
        .sources
        .iter()
        .map(|c| c.source_path().to_string())
        .collect()
}

/// Full pipeline: project → build → ask → answer with sources
#[test]
fn test_full_pipeline() {
    let project = tempdir().unwrap();
    let base = tempdir().unwrap();
    sample_project(project.path());
    let config = config(project.path(), base.path());

    let (index, status) = initialize(&config, embedder()).unwrap();
    assert_eq!(
        status,
        IndexStatus::Built {
            documents: 3,
            chunks: 3
        }
    );
    assert!(config.index_location().starts_with(base.path()));
    assert!(config.index_location().exists());

    let model = Arc::new(MockModel::new([REPLY]));
    let engine = QueryEngine::from_config(&config, index, model.clone());
    let response = engine
        .ask("Where does AppDelegate open the Database?")
        .unwrap();

    assert_eq!(response.answer.answer, "AppDelegate opens it on launch.");
    assert_eq!(response.answer.code_snippets[0].language, "swift");
    assert!(
        response.sources[0].source_path().ends_with("AppDelegate.swift"),
        "top source should be AppDelegate, got {:?}",
        response.sources[0].source_path()
    );
    for source in &response.sources {
        let path = source.source_path();
        assert!(!path.contains("Pods"), "excluded file retrieved: {path}");
        assert!(!path.contains("northstar"), "excluded file retrieved: {path}");
    }

    let prompt = &model.prompts()[0];
    assert!(prompt.contains("Database.open(path: \"app.db\")"));
    assert!(prompt.contains("Where does AppDelegate open the Database?"));
}

/// Repeated identical questions against an unchanged index hit the same sources.
#[test]
fn test_repeated_question_same_sources() {
    let project = tempdir().unwrap();
    let base = tempdir().unwrap();
    sample_project(project.path());
    let config = config(project.path(), base.path());

    let (index, _) = initialize(&config, embedder()).unwrap();
    let engine = QueryEngine::from_config(&config, index, Arc::new(MockModel::new([REPLY])));

    let question = "How does the client fetch a URL?";
    let first = source_set(&engine, question);
    assert!(!first.is_empty());
    for _ in 0..3 {
        assert_eq!(source_set(&engine, question), first);
    }
}

/// A second startup reuses the persisted index and answers the same way.
#[test]
fn test_reload_after_restart() {
    let project = tempdir().unwrap();
    let base = tempdir().unwrap();
    sample_project(project.path());
    let config = config(project.path(), base.path());
    let question = "Where does AppDelegate open the Database?";

    let before = {
        let (index, _) = initialize(&config, embedder()).unwrap();
        let engine = QueryEngine::from_config(&config, index, Arc::new(MockModel::new([REPLY])));
        source_set(&engine, question)
    };

    // New files after the build are not picked up: the index is built once.
    write(project.path(), "App/Late.swift", "struct Late {}\n");

    let (index, status) = initialize(&config, embedder()).unwrap();
    assert_eq!(status, IndexStatus::Loaded { entries: 3 });
    let engine = QueryEngine::from_config(&config, index, Arc::new(MockModel::new([REPLY])));
    assert!(engine.is_ready());
    assert_eq!(source_set(&engine, question), before);
}

/// A build that dies partway (provider down) does not block the next start.
#[test]
fn test_restart_after_failed_build() {
    let project = tempdir().unwrap();
    let base = tempdir().unwrap();
    sample_project(project.path());
    let mut config = config(project.path(), base.path());
    config.batch_size = 1;

    let flaky: Arc<dyn Embedder> = Arc::new(MockEmbedder::failing_from_batch(256, 2));
    let err = initialize(&config, flaky).unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)), "got {err}");
    assert!(!config.index_location().exists());

    let (index, status) = initialize(&config, embedder()).unwrap();
    assert_eq!(
        status,
        IndexStatus::Built {
            documents: 3,
            chunks: 3
        }
    );
    drop(index);

    let (_, status) = initialize(&config, embedder()).unwrap();
    assert_eq!(status, IndexStatus::Loaded { entries: 3 });
}

#[test]
fn test_reload_with_different_embedder_rejected() {
    let project = tempdir().unwrap();
    let base = tempdir().unwrap();
    sample_project(project.path());
    let config = config(project.path(), base.path());

    drop(initialize(&config, embedder()).unwrap());

    let other: Arc<dyn Embedder> = Arc::new(MockEmbedder::new(128));
    let err = initialize(&config, other).unwrap_err();
    assert!(matches!(err, RagError::EmbeddingMismatch { .. }), "got {err}");
}

#[test]
fn test_projects_get_separate_indexes() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let base = tempdir().unwrap();
    sample_project(a.path());
    write(b.path(), "Main.swift", "print(\"hello\")\n");

    let config_a = config(a.path(), base.path());
    let config_b = config(b.path(), base.path());
    assert_ne!(config_a.index_location(), config_b.index_location());

    let (_, status_a) = initialize(&config_a, embedder()).unwrap();
    let (_, status_b) = initialize(&config_b, embedder()).unwrap();
    assert!(matches!(status_a, IndexStatus::Built { documents: 3, .. }));
    assert!(matches!(status_b, IndexStatus::Built { documents: 1, .. }));
}

#[test]
fn test_trailing_separator_shares_index() {
    let project = tempdir().unwrap();
    let base = tempdir().unwrap();
    sample_project(project.path());

    let plain = config(project.path(), base.path());
    let mut trailing = plain.clone();
    trailing.project_path = Some(format!("{}/", project.path().display()));
    assert_eq!(plain.index_location(), trailing.index_location());

    drop(initialize(&plain, embedder()).unwrap());
    let (_, status) = initialize(&trailing, embedder()).unwrap();
    assert!(matches!(status, IndexStatus::Loaded { .. }));
}

/// Collection honors the denylist and chunking respects the size bound.
#[test]
fn test_collect_and_chunk_large_file() {
    let project = tempdir().unwrap();
    sample_project(project.path());

    let body: String = (0..60)
        .map(|i| format!("    func handler{i}(value: Int) -> Int {{\n        return value * {i}\n    }}\n\n"))
        .collect();
    write(
        project.path(),
        "App/Handlers.swift",
        &format!("final class Handlers {{\n{body}}}\n"),
    );

    let config = config(project.path(), project.path());
    let documents = collect(project.path(), &CollectOptions::from(&config)).unwrap();
    let mut paths: Vec<String> = documents
        .iter()
        .map(|d| d.metadata.source_path.clone())
        .collect();
    paths.sort();
    assert_eq!(paths.len(), 4);
    assert!(paths.iter().all(|p| p.ends_with(".swift")));
    assert!(paths.iter().all(|p| !p.contains("Pods") && !p.contains("northstar")));

    let chunks = Chunker::new(config.chunking).chunk(&documents);
    let handlers: Vec<_> = chunks
        .iter()
        .filter(|c| c.source_path().ends_with("Handlers.swift"))
        .collect();
    assert!(handlers.len() > 1, "large file should be split");
    for chunk in &handlers {
        assert!(chunk.text.chars().count() <= config.chunking.chunk_size);
        assert!(!chunk.text.trim().is_empty());
    }
}

#[test]
fn test_unset_project_path_fails_fast() {
    let base = tempdir().unwrap();
    let config = Config {
        index_base_dir: base.path().join("db").to_string_lossy().into_owned(),
        show_progress: false,
        ..Config::default()
    };
    let err = initialize(&config, embedder()).unwrap_err();
    assert!(matches!(err, RagError::Configuration(_)));
    assert!(!base.path().join("db").exists());
}
