//! Ingestion: collect source files and cut them into chunks.

pub mod chunker;
pub mod collector;
pub mod document;
pub mod languages;
pub mod splitter;
pub mod syntax;

pub use chunker::Chunker;
pub use collector::{CollectOptions, CollectStats, collect, collect_with_stats};
pub use document::{Chunk, Document, Metadata};
