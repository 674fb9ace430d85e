//! policydesk - Main CLI entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use policydesk::agent::SupportPipeline;
use policydesk::config::Config;
use policydesk::eligibility::ReturnWindows;
use policydesk::gateway::{OpenAiCompletion, OpenAiEmbeddings};
use policydesk::rag::{load_documents, IngestionPipeline, RetrievalEngine, SearchParams, TextChunker};
use policydesk::store::{CollectionStatus, VectorStore};
use policydesk::tools::ToolExecutor;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// policydesk - answer eCommerce return and refund queries from your own policies
#[derive(Parser, Debug)]
#[command(name = "policydesk")]
#[command(version)]
#[command(about = "Policy-grounded customer service responder", long_about = None)]
struct Args {
    /// Customer query to answer
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output (show analysis and evidence)
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest policy documents into the vector store
    Ingest {
        /// Directory of policy documents (.txt/.md)
        #[arg(long, default_value = "data/policies")]
        dir: PathBuf,

        /// Drop and fully rebuild the collection
        #[arg(long)]
        rebuild: bool,
    },

    /// Search the policy knowledge base directly
    Search {
        /// Search query
        query: String,

        /// Number of results
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Check return eligibility for a purchase
    Check {
        /// Purchase date (YYYY-MM-DD)
        #[arg(long)]
        purchase_date: String,

        /// Product category
        #[arg(long, default_value = "general")]
        category: String,

        /// Reference date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Show vector store statistics
    Stats,

    /// Display the effective configuration
    Config,
}

impl Args {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.command.is_none() && self.query.is_none() {
            return Err(
                "A customer query or a subcommand is required. Try 'policydesk \"<query>\"' or 'policydesk ingest'."
                    .to_string(),
            );
        }
        if self.command.is_some() && self.query.is_some() {
            return Err("Cannot combine a query with a subcommand.".to_string());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(msg) = args.validate() {
        eprintln!("{} {}", "Error:".red().bold(), msg);
        std::process::exit(1);
    }

    // Configuration problems are fatal here, before any component exists.
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Ingest { ref dir, rebuild }) => run_ingest(&config, dir, rebuild).await,
        Some(Commands::Search { ref query, top_k }) => run_search(&config, query, top_k).await,
        Some(Commands::Check {
            ref purchase_date,
            ref category,
            ref as_of,
        }) => run_check(&config, purchase_date, category, as_of.as_deref()).await,
        Some(Commands::Stats) => run_stats(&config),
        Some(Commands::Config) => run_show_config(&config),
        None => {
            let query = args.query.as_deref().unwrap_or_default();
            run_query(&config, query, args.verbose).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn embedder(config: &Config) -> Result<OpenAiEmbeddings> {
    let api_key = config.require_api_key()?;
    Ok(OpenAiEmbeddings::new(
        &config.api.base_url,
        api_key,
        &config.api.embedding_model,
        config.api.embedding_dimension,
        Duration::from_secs(config.api.request_timeout_secs),
    )?)
}

fn open_store(config: &Config) -> Result<VectorStore> {
    Ok(VectorStore::open(
        &config.store.path,
        &config.store.collection,
        config.api.embedding_dimension,
    )?)
}

fn retrieval_engine(config: &Config, store: VectorStore) -> Result<RetrievalEngine> {
    let params = SearchParams {
        top_k: config.rag.top_k,
        min_score: None,
    };
    Ok(RetrievalEngine::new(
        Arc::new(embedder(config)?),
        Arc::new(store),
        params,
        Duration::from_secs(config.api.request_timeout_secs),
    ))
}

fn executor(config: &Config) -> Result<ToolExecutor> {
    let store = open_store(config)?;
    let retrieval = retrieval_engine(config, store)?;
    Ok(ToolExecutor::new(
        Arc::new(retrieval),
        ReturnWindows::new(config.returns.clone()),
    ))
}

async fn run_ingest(config: &Config, dir: &PathBuf, rebuild: bool) -> Result<()> {
    let documents = load_documents(dir)?;
    println!(
        "Loaded {} policy documents from {}",
        documents.len(),
        dir.display()
    );

    let chunker = TextChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
    let pipeline = IngestionPipeline::new(chunker, Arc::new(embedder(config)?));
    let mut store = open_store(config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Embedding {} documents...", documents.len()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let written = pipeline.ingest(&mut store, &documents, rebuild).await;
    pb.finish_and_clear();

    let written = written?;
    println!(
        "{} {} chunks written to collection '{}'",
        "Done:".green().bold(),
        written,
        store.name()
    );
    Ok(())
}

async fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let executor = executor(config)?;

    let mut tool_args = json!({ "query": query });
    if let Some(k) = top_k {
        tool_args["top_k"] = json!(k);
    }

    let result = executor.execute("policy_search", &tool_args).await?;
    if result.success {
        println!("{}", result.output);
        println!(
            "{}",
            format!("({}ms)", result.duration_ms).dimmed()
        );
    } else {
        eprintln!(
            "{} {}",
            "Search failed:".red().bold(),
            result.error.unwrap_or_default()
        );
        std::process::exit(1);
    }
    Ok(())
}

async fn run_check(
    config: &Config,
    purchase_date: &str,
    category: &str,
    as_of: Option<&str>,
) -> Result<()> {
    // Pure date arithmetic; no store or network involved.
    use chrono::NaiveDate;
    use policydesk::eligibility;

    let windows = ReturnWindows::new(config.returns.clone());
    let purchase = NaiveDate::parse_from_str(purchase_date, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid --purchase-date '{}'; expected YYYY-MM-DD", purchase_date))?;
    let as_of = match as_of {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("invalid --as-of '{}'; expected YYYY-MM-DD", raw))?,
        None => chrono::Local::now().date_naive(),
    };

    let verdict = eligibility::evaluate(purchase, category, as_of, &windows)?;
    let header = if verdict.eligible {
        "ELIGIBLE".green().bold()
    } else {
        "NOT ELIGIBLE".red().bold()
    };
    println!("{}", header);
    println!("{}", verdict.summary());
    Ok(())
}

fn run_stats(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    println!("Collection: {}", store.name());
    println!("Path: {}", config.store.path.display());
    println!("Entries: {}", store.len());
    println!(
        "Status: {}",
        match store.status() {
            CollectionStatus::Ready => "ready".green(),
            CollectionStatus::Building => "mid-rebuild (re-ingest with --rebuild)".yellow(),
        }
    );
    Ok(())
}

fn run_show_config(config: &Config) -> Result<()> {
    let mut masked = config.clone();
    if masked.api.api_key.is_some() {
        masked.api.api_key = Some("****".to_string());
    }
    println!("{}", toml::to_string_pretty(&masked)?);
    Ok(())
}

async fn run_query(config: &Config, query: &str, verbose: bool) -> Result<()> {
    let store = open_store(config)?;
    if store.is_empty() && store.status() == CollectionStatus::Ready {
        eprintln!(
            "{} the policy collection is empty; run {} first",
            "Note:".yellow().bold(),
            "policydesk ingest".bold()
        );
    }

    let retrieval = retrieval_engine(config, store)?;
    let tool_executor = ToolExecutor::new(
        Arc::new(retrieval),
        ReturnWindows::new(config.returns.clone()),
    );

    let api_key = config.require_api_key()?;
    let completion = OpenAiCompletion::new(
        &config.api.base_url,
        api_key,
        &config.api.llm_model,
        Duration::from_secs(config.api.request_timeout_secs),
    )?;

    let pipeline =
        SupportPipeline::new(Arc::new(completion), tool_executor).with_verbose(verbose);

    let response = pipeline.answer(query).await?;

    if verbose {
        println!("{}", "--- Analysis ---".dimmed());
        println!("{}", serde_json::to_string_pretty(&response.analysis)?);
        println!("{}", "--- Evidence ---".dimmed());
        println!("{}", response.evidence.policy_context);
        if let Some(eligibility) = &response.evidence.eligibility {
            println!(
                "{}",
                eligibility
                    .error
                    .as_deref()
                    .unwrap_or(&eligibility.output)
            );
        }
        println!("{}", "--- Response ---".dimmed());
    }

    println!("{}", response.answer);
    Ok(())
}
