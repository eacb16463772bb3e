/// Language-aware chunking of loaded documents.
use std::collections::HashMap;

use tracing::{debug, info};

use super::document::{Chunk, Document};
use super::languages::{GENERIC_SEPARATORS, LanguageConfig};
use super::splitter::RecursiveSplitter;
use super::syntax::SyntaxCutter;
use crate::config::ChunkingConfig;

const GENERIC: &str = "generic";

struct LanguageSplitter {
    splitter: RecursiveSplitter,
    cutter: Option<SyntaxCutter>,
}

impl LanguageSplitter {
    fn split(&mut self, doc: &Document, language: &str) -> Vec<String> {
        if let Some(cutter) = self.cutter.as_mut() {
            match cutter.cut(&doc.text) {
                Ok(pieces) => return self.splitter.split_pieces(&pieces),
                Err(e) => debug!(
                    "Syntax pass failed for {} ({language}): {e}; using separators only",
                    doc.metadata.source_path
                ),
            }
        }
        self.splitter.split_text(&doc.text)
    }
}

/// Splits documents into overlapping chunks, picking a strategy by extension.
///
/// One splitter is built per language on first use and reused afterwards.
pub struct Chunker {
    config: ChunkingConfig,
    splitters: HashMap<&'static str, LanguageSplitter>,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            splitters: HashMap::new(),
        }
    }

    /// Chunk every document, preserving document order.
    pub fn chunk(&mut self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect();
        info!("Split {} documents into {} chunks", documents.len(), chunks.len());
        chunks
    }

    pub fn chunk_document(&mut self, doc: &Document) -> Vec<Chunk> {
        if doc.text.trim().is_empty() {
            return Vec::new();
        }

        let language = doc
            .extension()
            .and_then(|ext| LanguageConfig::get_by_extension(&ext));
        let key = language.as_ref().map_or(GENERIC, |l| l.name);
        let config = self.config;
        let splitter = self
            .splitters
            .entry(key)
            .or_insert_with(|| build_splitter(language.as_ref(), config));

        splitter
            .split(doc, key)
            .into_iter()
            .map(|text| Chunk {
                text,
                metadata: doc.metadata.clone(),
            })
            .collect()
    }

    /// Number of distinct splitters built so far.
    #[must_use]
    pub fn cached_splitters(&self) -> usize {
        self.splitters.len()
    }
}

fn build_splitter(language: Option<&LanguageConfig>, config: ChunkingConfig) -> LanguageSplitter {
    let Some(language) = language else {
        return LanguageSplitter {
            splitter: RecursiveSplitter::new(GENERIC_SEPARATORS, config.chunk_size, config.chunk_overlap),
            cutter: None,
        };
    };

    let cutter = language.language().and_then(|grammar| {
        SyntaxCutter::new(&grammar)
            .map_err(|e| debug!("No syntax pass for {}: {e}", language.name))
            .ok()
    });
    debug!(
        "Built {} splitter (syntax pass: {})",
        language.name,
        cutter.is_some()
    );

    LanguageSplitter {
        splitter: RecursiveSplitter::new(language.separators, config.chunk_size, config.chunk_overlap),
        cutter,
    }
}
