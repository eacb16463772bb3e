use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use coderag::config::Config;
use coderag::embedder::Embedder;
use coderag::embedder::ollama::OllamaEmbedder;
use coderag::engine::{QueryEngine, initialize};
use coderag::llm::ollama::OllamaModel;
use coderag::server::{self, AskReply};

#[derive(Parser)]
#[command(name = "coderag", version, about = "Ask questions about a local codebase")]
struct Cli {
    /// JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: String,

    /// Root of the project to index
    #[arg(long, env = "PROJECT_PATH")]
    project_path: Option<String>,

    #[arg(long, env = "OLLAMA_HOST")]
    ollama_host: Option<String>,

    #[arg(long, env = "OLLAMA_MODEL")]
    ollama_model: Option<String>,

    #[arg(long, env = "OLLAMA_EMBED_MODEL")]
    ollama_embed_model: Option<String>,

    #[arg(long, env = "CODERAG_BIND")]
    bind: Option<String>,

    #[arg(long, env = "CODERAG_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load or build the index, then serve HTTP (default)
    Serve,
    /// Load or build the index and report what happened
    Index,
    /// Answer one question and print the JSON reply
    Ask { question: String },
    /// Print the project path and its index location
    Location,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.project_path {
            config.project_path = Some(path.clone());
        }
        if let Some(host) = &self.ollama_host {
            config.ollama.host = host.clone();
        }
        if let Some(model) = &self.ollama_model {
            config.ollama.model = model.clone();
        }
        if let Some(model) = &self.ollama_embed_model {
            config.ollama.embedding_model = model.clone();
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

fn engine(config: &Config) -> Result<QueryEngine> {
    let embedder: Arc<dyn Embedder> = Arc::new(
        OllamaEmbedder::from_config(&config.ollama).context("Failed to create embedder")?,
    );
    let model = Arc::new(
        OllamaModel::from_config(&config.ollama).context("Failed to create language model")?,
    );

    let (index, status) = initialize(config, embedder).context("Failed to initialize index")?;
    info!("Index ready: {}", serde_json::to_string(&status)?);
    Ok(QueryEngine::from_config(config, index, model))
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    cli.apply(&mut config);

    match cli.command.as_ref().unwrap_or(&Command::Serve) {
        Command::Serve => {
            // Providers use blocking HTTP clients, which must be created and
            // dropped outside the async runtime.
            let addr = config.server.socket_addr()?;
            let engine = Arc::new(engine(&config)?);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(server::serve(Arc::clone(&engine), addr))?;
            drop(runtime);
        }
        Command::Index => {
            let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::from_config(&config.ollama)?);
            let (index, status) = initialize(&config, embedder)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            info!("{} entries at {}", index.len()?, index.location().display());
        }
        Command::Ask { question } => {
            let engine = engine(&config)?;
            let response = engine.ask(question)?;
            println!("{}", serde_json::to_string_pretty(&AskReply::from(response))?);
        }
        Command::Location => {
            let project = config.project_root()?;
            println!("project: {}", project.display());
            println!("index:   {}", config.index_location().display());
        }
    }

    Ok(())
}
