/// Source collection: walk the project root and load eligible files.
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{info, warn};

use super::document::Document;
use crate::config::Config;
use crate::error::{FileLoadError, RagError, Result};
use crate::progress;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectStats {
    pub found: usize,
    pub excluded: usize,
    pub loaded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub include_extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
    pub show_progress: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for CollectOptions {
    fn from(config: &Config) -> Self {
        Self {
            include_extensions: config.include_extensions.clone(),
            exclude: config.exclude.clone(),
            respect_gitignore: config.respect_gitignore,
            show_progress: config.show_progress,
        }
    }
}

/// Denylisted subtrees. Plain entries match a leading run of path
/// components; entries with glob metacharacters are matched as globs
/// against the whole relative path.
struct Denylist {
    prefixes: Vec<PathBuf>,
    globs: GlobSet,
}

impl Denylist {
    fn new(entries: &[String]) -> Result<Self> {
        let mut prefixes = Vec::new();
        let mut builder = GlobSetBuilder::new();
        for entry in entries {
            let entry = entry.trim().trim_matches('/');
            if entry.is_empty() {
                continue;
            }
            if entry.contains(['*', '?', '[', '{']) {
                let glob = Glob::new(entry).map_err(|e| {
                    RagError::Configuration(format!("invalid exclude pattern {entry:?}: {e}"))
                })?;
                builder.add(glob);
            } else {
                prefixes.push(PathBuf::from(entry));
            }
        }
        let globs = builder
            .build()
            .map_err(|e| RagError::Configuration(format!("invalid exclude patterns: {e}")))?;
        Ok(Self { prefixes, globs })
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.prefixes.iter().any(|p| relative.starts_with(p)) || self.globs.is_match(relative)
    }
}

fn check_root(root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(RagError::Configuration(
            "project root is not set".to_string(),
        ));
    }
    if root.parent().is_none() {
        return Err(RagError::Configuration(format!(
            "refusing to scan the filesystem root {}",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(RagError::Configuration(format!(
            "project root {} does not exist or is not a directory",
            root.display()
        )));
    }
    Ok(())
}

fn has_included_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

fn load(path: &Path) -> std::result::Result<Document, FileLoadError> {
    let text = fs::read_to_string(path).map_err(|source| FileLoadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Document::new(text, path.to_string_lossy()))
}

/// Load every eligible file under `root`.
pub fn collect(root: &Path, options: &CollectOptions) -> Result<Vec<Document>> {
    collect_with_stats(root, options).map(|(docs, _)| docs)
}

/// Like [`collect`], also reporting how many files were found, excluded,
/// loaded and skipped.
pub fn collect_with_stats(
    root: &Path,
    options: &CollectOptions,
) -> Result<(Vec<Document>, CollectStats)> {
    check_root(root)?;
    let denylist = Denylist::new(&options.exclude)?;
    let mut stats = CollectStats::default();

    // Hidden files are visited; VCS ignore rules only when asked for.
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(options.respect_gitignore)
        .ignore(options.respect_gitignore)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .build();

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if !has_included_extension(path, &options.include_extensions) {
            continue;
        }

        stats.found += 1;
        let relative = path.strip_prefix(root).unwrap_or(path);
        if denylist.is_excluded(relative) {
            stats.excluded += 1;
            continue;
        }
        paths.push(path.to_path_buf());
    }
    info!(
        "Found {} source files under {} ({} excluded)",
        stats.found,
        root.display(),
        stats.excluded
    );

    let pb = progress::bar(paths.len(), "files", options.show_progress);
    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        match load(path) {
            Ok(doc) => {
                stats.loaded += 1;
                documents.push(doc);
            }
            Err(e) => {
                stats.failed += 1;
                warn!("{e}");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Loaded {} documents ({} failed to load)",
        stats.loaded, stats.failed
    );
    Ok((documents, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn quiet() -> CollectOptions {
        CollectOptions {
            show_progress: false,
            ..CollectOptions::default()
        }
    }

    #[test]
    fn test_denylisted_subtrees_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "A.swift", b"struct A {}");
        write(dir.path(), "Pods/B.swift", b"struct B {}");
        write(dir.path(), "Externals/northstar/C.swift", b"struct C {}");

        let (docs, stats) = collect_with_stats(dir.path(), &quiet()).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].metadata.source_path.ends_with("A.swift"));
        assert_eq!(docs[0].text, "struct A {}");
        assert_eq!(
            stats,
            CollectStats {
                found: 3,
                excluded: 2,
                loaded: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_only_included_extensions() {
        let dir = tempdir().unwrap();
        write(dir.path(), "Sources/App.swift", b"let a = 1");
        write(dir.path(), "README.md", b"# readme");
        write(dir.path(), "Sources/main.rs", b"fn main() {}");

        let docs = collect(dir.path(), &quiet()).unwrap();
        assert_eq!(docs.len(), 1);

        let options = CollectOptions {
            include_extensions: vec!["swift".into(), ".rs".into()],
            ..quiet()
        };
        assert_eq!(collect(dir.path(), &options).unwrap().len(), 2);
    }

    #[test]
    fn test_prefix_match_is_per_component() {
        let dir = tempdir().unwrap();
        write(dir.path(), "PodsHelper/D.swift", b"struct D {}");
        write(dir.path(), "Externals/northstarish/E.swift", b"struct E {}");

        let docs = collect(dir.path(), &quiet()).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_glob_exclude() {
        let dir = tempdir().unwrap();
        write(dir.path(), "App/View.swift", b"struct V {}");
        write(dir.path(), "App/ViewTests.swift", b"struct T {}");

        let options = CollectOptions {
            exclude: vec!["**/*Tests.swift".into()],
            ..quiet()
        };
        let docs = collect(dir.path(), &options).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].metadata.source_path.ends_with("View.swift"));
    }

    #[test]
    fn test_invalid_utf8_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "Good.swift", b"let ok = true");
        write(dir.path(), "Bad.swift", &[0xff, 0xfe, 0x00, 0xc3]);

        let (docs, stats) = collect_with_stats(dir.path(), &quiet()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.loaded, 1);
    }

    #[test]
    fn test_hidden_files_visited_gitignore_off_by_default() {
        let dir = tempdir().unwrap();
        write(dir.path(), ".build/Gen.swift", b"let g = 1");
        write(dir.path(), "Ignored.swift", b"let i = 1");
        write(dir.path(), ".gitignore", b"Ignored.swift\n");

        assert_eq!(collect(dir.path(), &quiet()).unwrap().len(), 2);

        let options = CollectOptions {
            respect_gitignore: true,
            ..quiet()
        };
        let docs = collect(dir.path(), &options).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].metadata.source_path.ends_with("Gen.swift"));
    }

    #[test]
    fn test_filesystem_root_rejected() {
        let err = collect(Path::new("/"), &quiet()).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn test_missing_root_rejected() {
        let dir = tempdir().unwrap();
        let err = collect(&dir.path().join("nope"), &quiet()).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        let err = collect(Path::new(""), &quiet()).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn test_empty_project() {
        let dir = tempdir().unwrap();
        let (docs, stats) = collect_with_stats(dir.path(), &quiet()).unwrap();
        assert!(docs.is_empty());
        assert_eq!(stats, CollectStats::default());
    }
}
