/// The persisted vector index: batched one-time build and reload.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::Config;
use crate::db::models::{Candidate, IndexMeta};
use crate::db::{DB_FILE, Db};
use crate::embedder::{Embedder, EmbedderError};
use crate::error::{RagError, Result};
use crate::indexer::Chunk;
use crate::progress;

/// Storage engine behind an [`Index`].
pub trait VectorIndex {
    /// Append one batch of chunks with their embeddings.
    fn add(&mut self, batch: usize, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<i64>>;

    /// The `k` entries nearest to `vector`, closest first.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Candidate>>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl VectorIndex for Db {
    fn add(&mut self, batch: usize, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<i64>> {
        if !self.has_vector_table() {
            if let Some(first) = embeddings.first() {
                self.ensure_vector_table(first.len())?;
            }
        }
        Ok(self.append_batch(batch, chunks, embeddings)?)
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Candidate>> {
        Ok(self.nearest(vector, k)?)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.count()?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for BuildOptions {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            show_progress: config.show_progress,
        }
    }
}

/// A queryable index bound to the embedder that produced it.
pub struct Index {
    store: Mutex<Box<dyn VectorIndex + Send>>,
    embedder: Arc<dyn Embedder>,
    location: PathBuf,
    meta: IndexMeta,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("location", &self.location)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl Index {
    /// Embed `chunks` batch by batch and persist them at `location`.
    ///
    /// Refuses to touch an existing location. Each batch is written in its own
    /// transaction; the index is marked complete after the last one.
    pub fn build(
        chunks: &[Chunk],
        location: &Path,
        embedder: Arc<dyn Embedder>,
        options: BuildOptions,
    ) -> Result<Self> {
        if location.exists() {
            return Err(RagError::IndexExists {
                location: location.to_path_buf(),
            });
        }
        let batch_size = options.batch_size.max(1);
        let total_batches = chunks.len().div_ceil(batch_size);
        info!(
            "Building index at {} ({} chunks, {} batches)",
            location.display(),
            chunks.len(),
            total_batches
        );

        fs::create_dir_all(location)?;
        // Declared before `db` so the connection closes before cleanup runs.
        let mut guard = PartialBuild::new(location);
        let mut db = Db::open(location.join(DB_FILE))?;
        let dimensions = embedder.dimensions();
        db.write_header(&embedder.model_id(), dimensions)?;

        let pb = progress::bar(total_batches, "batches", options.show_progress);
        for (i, batch) in chunks.chunks(batch_size).enumerate() {
            info!(
                "Processing batch {}/{} ({} chunks)",
                i + 1,
                total_batches,
                batch.len()
            );
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = embedder.embed_batch(&texts)?;
            check_embeddings(&embeddings, batch.len(), dimensions)?;

            VectorIndex::add(&mut db, i, batch, &embeddings)?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        // An empty build still gets its vector table so reloads look alike.
        db.ensure_vector_table(dimensions)?;
        db.mark_complete()?;

        let meta = db
            .read_meta()?
            .ok_or_else(|| RagError::IncompleteIndex {
                location: location.to_path_buf(),
            })?;
        info!("Index built: {} entries", meta.count);
        guard.disarm();

        Ok(Self {
            store: Mutex::new(Box::new(db)),
            embedder,
            location: location.to_path_buf(),
            meta,
        })
    }

    /// Attach to an index persisted by an earlier [`Index::build`].
    pub fn load(location: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if !location.exists() {
            return Err(RagError::StoreNotFound {
                location: location.to_path_buf(),
            });
        }
        let incomplete = || RagError::IncompleteIndex {
            location: location.to_path_buf(),
        };

        let db_path = location.join(DB_FILE);
        if !db_path.is_file() {
            return Err(incomplete());
        }
        let db = Db::open(&db_path)?;
        let meta = db.read_meta()?.ok_or_else(incomplete)?;
        if !meta.complete {
            return Err(incomplete());
        }

        let expected = embedder.model_id();
        if meta.model_id != expected || meta.dimensions != embedder.dimensions() {
            return Err(RagError::EmbeddingMismatch {
                expected: format!("{expected} ({} dims)", embedder.dimensions()),
                found: format!("{} ({} dims)", meta.model_id, meta.dimensions),
            });
        }

        info!(
            "Loaded index from {} ({} entries, built {})",
            location.display(),
            meta.count,
            meta.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(Self {
            store: Mutex::new(Box::new(db)),
            embedder,
            location: location.to_path_buf(),
            meta,
        })
    }

    /// Wrap any [`VectorIndex`], for instance an in-memory one.
    pub fn from_store(
        store: Box<dyn VectorIndex + Send>,
        embedder: Arc<dyn Embedder>,
        location: PathBuf,
        meta: IndexMeta,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            embedder,
            location,
            meta,
        }
    }

    /// Embed `text` with the index's embedder.
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embedder.embed(text)?)
    }

    /// The `k` nearest entries to `vector`. Holds the store lock only for
    /// the scan.
    pub fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Candidate>> {
        let store = self
            .store
            .lock()
            .map_err(|e| RagError::LockPoisoned(e.to_string()))?;
        store.query(vector, k)
    }

    pub fn len(&self) -> Result<usize> {
        let store = self
            .store
            .lock()
            .map_err(|e| RagError::LockPoisoned(e.to_string()))?;
        store.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    #[must_use]
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

}

/// Removes the directory of a build that did not finish, so the next start
/// builds again instead of failing on an incomplete index.
struct PartialBuild<'a> {
    location: &'a Path,
    armed: bool,
}

impl<'a> PartialBuild<'a> {
    fn new(location: &'a Path) -> Self {
        Self {
            location,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialBuild<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_dir_all(self.location) {
            Ok(()) => warn!("Build failed; removed partial index at {}", self.location.display()),
            Err(e) => warn!(
                "Build failed; could not remove partial index at {}: {e}",
                self.location.display()
            ),
        }
    }
}

fn check_embeddings(embeddings: &[Vec<f32>], expected: usize, dimensions: usize) -> Result<()> {
    if embeddings.len() != expected {
        return Err(EmbedderError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            embeddings.len()
        ))
        .into());
    }
    if let Some(bad) = embeddings.iter().find(|v| v.len() != dimensions) {
        return Err(EmbedderError::InvalidResponse(format!(
            "expected {dimensions}-dimensional embeddings, got {}",
            bad.len()
        ))
        .into());
    }
    Ok(())
}
