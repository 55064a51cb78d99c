use anyhow::Result;
use clap::{Parser, Subcommand};
use portfolio_rag::search::retrieval_mode;
use portfolio_rag::server::HttpServer;
use portfolio_rag::{Config, RagEngine};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "portfolio-rag")]
#[command(about = "Grounded question answering over a prebuilt portfolio knowledge base")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve POST /api/rag over HTTP (default)
    Serve,
    /// Answer one question and print the answer with its sources
    Ask {
        /// The question to answer
        question: Vec<String>,
    },
    /// Load the artifacts and report what retrieval would use
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let config = Config::load()?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await?,
        Command::Ask { question } => run_ask(config, &question.join(" ")).await?,
        Command::Check => run_check(config).await?,
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    log::info!("Starting portfolio-rag v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Knowledge base: {}", config.knowledge_path().display());
    log::info!("Embedding store: {}", config.embeddings_path().display());
    log::info!("Chat model: {}, embedding model: {}", config.openai.model, config.openai.embedding_model);

    let engine = Arc::new(RagEngine::from_config(&config)?);
    HttpServer::new(engine, config.http_server.clone()).run().await?;

    Ok(())
}

async fn run_ask(config: Config, question: &str) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Usage: portfolio-rag ask <question>");
    }

    let engine = RagEngine::from_config(&config)?;

    let start = Instant::now();
    let answer = engine.answer(question).await?;
    let duration = start.elapsed();

    println!("\nQuestion: {}\n", question);
    println!("{}\n", answer.answer);

    if !answer.sources.is_empty() {
        println!("Sources:");
        for (index, source) in answer.sources.iter().enumerate() {
            let url = source.url.as_deref().map(|u| format!(" <{}>", u)).unwrap_or_default();
            println!(
                "  {}. {} [{} / {}] {}{}",
                index + 1,
                source.title,
                source.chunk_type.as_str(),
                source.source.as_str(),
                source.id,
                url
            );
        }
    }

    println!("\nLatency: {:?}", duration);
    Ok(())
}

async fn run_check(config: Config) -> Result<()> {
    let engine = RagEngine::from_config(&config)?;
    let store = engine.store();

    let knowledge = store.knowledge().await?;
    println!("\n=== Knowledge base ===");
    println!("Path:     {}", store.knowledge_path().display());
    println!("Version:  {}", knowledge.version);
    println!("Created:  {}", knowledge.created_at);
    println!("Chunks:   {}", knowledge.chunks.len());

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for chunk in &knowledge.chunks {
        *by_type.entry(chunk.chunk_type.as_str()).or_default() += 1;
    }
    for (chunk_type, count) in &by_type {
        println!("  {:<12} {:>5}", chunk_type, count);
    }

    println!("\n=== Embedding store ===");
    println!("Path:     {}", store.embeddings_path().display());
    let embeddings = store.embeddings().await?;
    match &embeddings {
        Some(embeddings) => {
            println!("Model:      {}", embeddings.model);
            println!(
                "Dimensions: {}",
                embeddings
                    .dimensions
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unspecified".to_string())
            );
            println!("Vectors:    {}", embeddings.vectors.len());
            println!("Orphans:    {}", embeddings.orphan_count(&knowledge));
            if embeddings.model != config.openai.embedding_model {
                println!(
                    "Warning: queries are embedded with {}",
                    config.openai.embedding_model
                );
            }
        }
        None => println!("Not present"),
    }
    let mode = retrieval_mode(embeddings.as_deref());

    println!("\nRetrieval mode: {}", mode);
    println!("Top-K:          {}", config.rag.max_chunks);
    if !engine.is_configured() {
        println!("\nWarning: {} is not set; answers will be the unconfigured notice", config.openai.api_key_env);
    }

    Ok(())
}
