/// Configuration module.
///
/// Handles loading, validating, and providing default configuration values,
/// and derives the per-project index location.
use std::net::{IpAddr, SocketAddr};
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

// ── Default value functions ──────────────────────────────────────────

fn default_include_extensions() -> Vec<String> {
    vec!["swift".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["Pods".to_string(), "Externals/northstar".to_string()]
}

fn default_index_base_dir() -> String {
    "db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

fn default_chunk_size() -> usize {
    1024
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_k() -> usize {
    8
}

fn default_fetch_k() -> usize {
    20
}

fn default_mmr_lambda() -> f32 {
    0.5
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5-coder:7b".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

fn default_temperature() -> f32 {
    0.1
}

fn default_generate_timeout_secs() -> u64 {
    120
}

fn default_embed_timeout_secs() -> u64 {
    60
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Root of the codebase to index. Usually supplied via `PROJECT_PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,

    /// File extensions (without the dot) the collector picks up.
    #[serde(default = "default_include_extensions")]
    pub include_extensions: Vec<String>,

    /// Subtrees (relative to the project root) or globs that are never indexed.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub respect_gitignore: bool,

    #[serde(default = "default_index_base_dir")]
    pub index_base_dir: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_true")]
    pub show_progress: bool,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    /// Chunks handed to the language model.
    #[serde(default = "default_k")]
    pub k: usize,

    /// Nearest candidates fetched before diversity re-ranking.
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,

    /// 1.0 ranks purely by relevance, 0.0 purely by diversity.
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,

    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// The address to listen on; an unparsable `bind` is a configuration error.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind
            .trim()
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.port))
            .map_err(|e| RagError::Configuration(format!("invalid server bind '{}': {e}", self.bind)))
    }
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: None,
            include_extensions: default_include_extensions(),
            exclude: default_exclude(),
            respect_gitignore: false,
            index_base_dir: default_index_base_dir(),
            batch_size: default_batch_size(),
            show_progress: default_true(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            ollama: OllamaConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            fetch_k: default_fetch_k(),
            mmr_lambda: default_mmr_lambda(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            temperature: default_temperature(),
            generate_timeout_secs: default_generate_timeout_secs(),
            embed_timeout_secs: default_embed_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

fn ensure(cond: bool, msg: &str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(RagError::Configuration(msg.to_string()))
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`. A missing file
    /// yields the defaults; so does a file that is not valid JSON, with a
    /// warning.
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let chunking = &self.chunking;
        ensure(chunking.chunk_size > 0, "chunk_size must be positive")?;
        ensure(
            chunking.chunk_overlap < chunking.chunk_size,
            "chunk_overlap must be smaller than chunk_size",
        )?;
        ensure(self.batch_size > 0, "batch_size must be positive")?;
        ensure(self.retrieval.k > 0, "retrieval.k must be positive")?;
        ensure(
            self.retrieval.fetch_k >= self.retrieval.k,
            "retrieval.fetch_k must be at least retrieval.k",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.retrieval.mmr_lambda),
            "retrieval.mmr_lambda must be within [0, 1]",
        )?;
        ensure(
            !self.include_extensions.is_empty(),
            "at least one include extension must be specified",
        )?;
        ensure(
            self.ollama.embedding_dimensions > 0,
            "ollama.embedding_dimensions must be positive",
        )?;
        self.server.socket_addr()?;
        Ok(())
    }

    /// The project root, home-expanded and absolute.
    ///
    /// Fails when unset or when it is the filesystem root.
    pub fn project_root(&self) -> Result<PathBuf> {
        let raw = self
            .project_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                RagError::Configuration(
                    "PROJECT_PATH is not set; point it at the absolute path of your codebase"
                        .to_string(),
                )
            })?;

        let root = normalize_root(raw);
        if root.parent().is_none() {
            return Err(RagError::Configuration(format!(
                "PROJECT_PATH is set to the filesystem root ({raw}); point it at your codebase"
            )));
        }
        Ok(root)
    }

    /// Where this project's index lives.
    #[must_use]
    pub fn index_location(&self) -> PathBuf {
        index_location(&self.index_base_dir, self.project_path.as_deref())
    }
}

// ── Location helpers ─────────────────────────────────────────────────

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Home-expand, absolutize, and drop `.` components and trailing separators.
#[must_use]
pub fn normalize_root(path: &str) -> PathBuf {
    let expanded = expand_home(path);
    let absolute = std::path::absolute(&expanded).unwrap_or(expanded);
    absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Derive the index directory for a project root.
///
/// Unset roots share `base`; every other root gets
/// `base/index_<blake3 of the normalized path>`, so the same project always
/// maps to the same directory and different projects never collide.
#[must_use]
pub fn index_location(base: &str, project_path: Option<&str>) -> PathBuf {
    let Some(path) = project_path.map(str::trim).filter(|p| !p.is_empty()) else {
        return PathBuf::from(base);
    };
    let root = normalize_root(path);
    let digest = blake3::hash(root.to_string_lossy().as_bytes()).to_hex();
    Path::new(base).join(format!("index_{}", &digest[..32]))
}

// ── Tests ────────────────────────────────────────────────────────────
