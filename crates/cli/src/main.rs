use anyhow::{Context, Result};
use careguide_chunk_store::load_document;
use careguide_generation::{ClinicalPrompt, CompletionClient, Generator};
use careguide_indexer::{build_index, persist, read_manifest, IndexBundle, IndexHandle, IndexerError};
use careguide_search::{
    join_context, KeywordRetriever, RetrievedChunk, Retriever, VectorRetriever,
};
use careguide_vector_store::{embedder_from_config, EmbeddingMode};
use clap::{Args, Parser, Subcommand};
use config::{CareguideConfig, Strategy};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod fluid;

#[derive(Parser)]
#[command(name = "careguide")]
#[command(about = "Answer paediatric clinical questions from hospital guidelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (overrides CAREGUIDE_CONFIG and ./careguide.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index directory (overrides CAREGUIDE_INDEX_DIR)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Embedding backend: onnx|stub (overrides CAREGUIDE_EMBEDDING_MODE)
    #[arg(long, global = true)]
    embed_mode: Option<EmbeddingMode>,

    /// Embedding model id (overrides CAREGUIDE_EMBEDDING_MODEL)
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Model directory (overrides CAREGUIDE_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and persist an extracted guideline document
    Build(BuildArgs),

    /// Show the guideline sections most relevant to a query
    Search(SearchArgs),

    /// Answer a clinical question from retrieved guideline context
    Ask(AskArgs),

    /// Show the published index and generation service availability
    Status(StatusArgs),

    /// Holliday-Segar daily maintenance fluid requirement
    Fluid(FluidArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Extracted document: JSON pages or UTF-8 text with form-feed page breaks
    document: PathBuf,

    /// Output directory (defaults to the configured index dir)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RetrievalArgs {
    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Retrieval strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text query
    query: String,

    #[command(flatten)]
    retrieval: RetrievalArgs,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AskArgs {
    /// Clinical question
    question: String,

    #[command(flatten)]
    retrieval: RetrievalArgs,

    /// Completion endpoint (overrides CAREGUIDE_GENERATION_URL)
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args)]
struct StatusArgs {
    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FluidArgs {
    /// Body weight in kilograms
    #[arg(allow_negative_numbers = true)]
    weight_kg: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::Build(args) => args.json,
        Commands::Search(args) => args.json,
        Commands::Status(args) => args.json,
        _ => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ORT is extremely noisy
    if !cli.verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Commands::Fluid(args) = &cli.command {
        return run_fluid(args);
    }

    let config = resolve_config(&cli)?;
    match cli.command {
        Commands::Build(args) => run_build(args, config).await,
        Commands::Search(args) => run_search(args, config).await,
        Commands::Ask(args) => run_ask(args, config).await,
        Commands::Status(args) => run_status(args, config).await,
        Commands::Fluid(args) => run_fluid(&args),
    }
}

fn resolve_config(cli: &Cli) -> Result<CareguideConfig> {
    let mut config = CareguideConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.index_dir {
        config.index.dir = dir.clone();
    }
    if let Some(mode) = cli.embed_mode {
        config.embedding.mode = mode;
    }
    if let Some(model) = &cli.embed_model {
        config.embedding.model_id = model.clone();
    }
    if let Some(dir) = &cli.model_dir {
        config.embedding.model_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

#[derive(Serialize)]
struct BuildOutput {
    index_dir: PathBuf,
    generation: u64,
    model_id: String,
    #[serde(flatten)]
    stats: careguide_indexer::BuildStats,
}

async fn run_build(args: BuildArgs, config: CareguideConfig) -> Result<()> {
    let out = args.out.unwrap_or(config.index.dir);
    let raw = load_document(&args.document)
        .await
        .with_context(|| format!("Failed to read {}", args.document.display()))?;

    let embedder = embedder_from_config(&config.embedding).context("Failed to load embedder")?;
    let (bundle, stats): (IndexBundle, _) = build_index(&raw, embedder.as_ref()).await?;
    let manifest = persist(&bundle, &out)
        .await
        .with_context(|| format!("Failed to persist index to {}", out.display()))?;

    if args.json {
        let output = BuildOutput {
            index_dir: out,
            generation: manifest.generation,
            model_id: manifest.model_id,
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Indexed {} chunks ({} dropped, dim {}) in {} ms",
            stats.kept_chunks, stats.dropped_chunks, stats.dimension, stats.time_ms
        );
        println!(
            "Published generation {} to {}",
            manifest.generation,
            out.display()
        );
    }
    Ok(())
}

async fn open_retriever(
    config: &CareguideConfig,
    strategy: Strategy,
) -> Result<Box<dyn Retriever>> {
    let handle: IndexHandle = IndexHandle::open(&config.index.dir)
        .await
        .with_context(|| format!("Failed to load index from {}", config.index.dir.display()))?;
    let handle = Arc::new(handle);

    let retriever: Box<dyn Retriever> = match strategy {
        Strategy::Vector => {
            let embedder =
                embedder_from_config(&config.embedding).context("Failed to load embedder")?;
            Box::new(VectorRetriever::new(handle, embedder))
        }
        Strategy::Keyword => Box::new(KeywordRetriever::new(handle)),
    };
    Ok(retriever)
}

async fn retrieve_for(
    query: &str,
    retrieval: &RetrievalArgs,
    config: &CareguideConfig,
) -> Result<(Strategy, Vec<RetrievedChunk>)> {
    let strategy = retrieval.strategy.unwrap_or(config.retrieval.strategy);
    let top_k = retrieval.top_k.unwrap_or(config.retrieval.top_k);
    let retriever = open_retriever(config, strategy).await?;
    let hits = retriever.retrieve_scored(query, top_k).await?;
    Ok((strategy, hits))
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    strategy: &'static str,
    results: &'a [RetrievedChunk],
}

async fn run_search(args: SearchArgs, config: CareguideConfig) -> Result<()> {
    let (strategy, hits) = retrieve_for(&args.query, &args.retrieval, &config).await?;

    if args.json {
        let output = SearchOutput {
            query: &args.query,
            strategy: strategy.as_str(),
            results: &hits,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matching guideline sections found.");
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. [#{}] score {:.4}\n   {}",
            rank + 1,
            hit.position,
            hit.score,
            hit.text
        );
    }
    Ok(())
}

async fn run_ask(args: AskArgs, mut config: CareguideConfig) -> Result<()> {
    if let Some(url) = args.url {
        config.generation.url = url;
    }

    let (_, hits) = retrieve_for(&args.question, &args.retrieval, &config).await?;
    if hits.is_empty() {
        println!("No relevant information found in the guidelines.");
        return Ok(());
    }

    let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
    let prompt = ClinicalPrompt::render(&args.question, &join_context(&texts));
    let client = CompletionClient::new(config.generation)?;

    match client.generate(&prompt).await {
        Ok(answer) => {
            println!("{answer}");
            Ok(())
        }
        Err(err) => {
            log::error!("Generation failed: {err}");
            Err(err).context("Generation service unavailable")
        }
    }
}

#[derive(Serialize)]
struct StatusOutput {
    index_dir: PathBuf,
    manifest: Option<careguide_indexer::Manifest>,
    generation_url: String,
    generation_online: bool,
}

async fn run_status(args: StatusArgs, config: CareguideConfig) -> Result<()> {
    let manifest = match read_manifest(&config.index.dir).await {
        Ok(manifest) => Some(manifest),
        Err(IndexerError::NotFound(_)) => None,
        Err(err) => {
            return Err(err).with_context(|| {
                format!("Failed to read manifest in {}", config.index.dir.display())
            })
        }
    };
    let client = CompletionClient::new(config.generation.clone())?;
    let online = client.is_online().await;

    if args.json {
        let output = StatusOutput {
            index_dir: config.index.dir,
            manifest,
            generation_url: config.generation.url,
            generation_online: online,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &manifest {
        Some(m) => {
            println!("Index: {}", config.index.dir.display());
            println!("  generation:  {}", m.generation);
            println!("  chunks:      {}", m.chunk_count);
            println!("  dimension:   {}", m.dimension);
            println!("  model:       {}", m.model_id);
            println!("  built at:    {} (unix ms)", m.built_at_unix_ms);
        }
        None => println!("Index: none published under {}", config.index.dir.display()),
    }
    println!(
        "Generation service: {} ({})",
        if online { "online" } else { "offline" },
        client.root_url()
    );
    Ok(())
}

fn run_fluid(args: &FluidArgs) -> Result<()> {
    let total = fluid::daily_maintenance_ml(args.weight_kg)?;
    println!("{}", fluid::format_requirement(total));
    Ok(())
}
