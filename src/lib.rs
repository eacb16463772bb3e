//! # coderag: Local codebase question answering
//!
//! Indexes a project's source files once into a persisted vector index, then
//! answers natural-language questions with a local language model, grounded in
//! the retrieved code.
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading, validation, index location
//! - **[`indexer`]**: File collection, language-aware chunking
//! - **[`db`]**: SQLite + sqlite-vec storage for chunks and vectors
//! - **[`index`]**: Batched one-time build and reload of the index
//! - **[`embedder`]** / **[`llm`]**: Provider traits with Ollama backends
//! - **[`retriever`]**: Nearest-neighbour fetch with MMR re-ranking
//! - **[`synthesizer`]**: Prompting and tolerant answer parsing
//! - **[`engine`]**: Startup and the per-question pipeline
//! - **[`server`]**: HTTP interface (axum)

pub mod config;
pub mod db;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod index;
pub mod indexer;
pub mod llm;
pub mod progress;
pub mod retriever;
pub mod retry;
pub mod server;
pub mod synthesizer;

