//! neurotrends - Entry Point
//!
//! `search` exports OpenAlex works, `classify` triages them with an LLM,
//! `trends` fits growth curves over the curated dataset.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use neurotrends::client::{ModelOptionsTable, OpenAlexClient, OpenRouterClient, WorkQuery, build_search_query};
use neurotrends::config::{ClassifierConfig, OpenAlexConfig, PipelineConfig, api, defaults, openalex};
use neurotrends::harvest;
use neurotrends::pipeline::{Pipeline, SlidingWindowLimiter, require_credential};
use neurotrends::trends;

#[derive(Parser, Debug)]
#[command(name = "neurotrends")]
#[command(about = "Track neural recording scale: search, classify and fit trends")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export matching OpenAlex works to JSONL
    Search(SearchArgs),
    /// Classify works in batches with an OpenRouter model
    Classify(ClassifyArgs),
    /// Fit growth trends over the curated dataset
    Trends(TrendsArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Output JSONL (default: data/openalex_biorxiv_neuro_<date>.jsonl)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Earliest publication date (YYYY-MM-DD)
    #[arg(long, default_value = openalex::START_DATE)]
    start_date: String,

    /// Results per page (max 200)
    #[arg(long, default_value_t = api::MAX_PER_PAGE, value_parser = clap::value_parser!(u32).range(1..=200))]
    per_page: u32,

    /// Stop after this many works
    #[arg(long)]
    max_results: Option<usize>,

    /// Source filter (default: bioRxiv)
    #[arg(long)]
    source_id: Option<String>,

    /// Concept filter (default: Neuroscience)
    #[arg(long)]
    concept_id: Option<String>,

    /// Drop the default source and concept filters
    #[arg(long)]
    no_default_filters: bool,

    /// Contact email for the OpenAlex polite pool
    #[arg(long, env = "OPENALEX_MAILTO")]
    mailto: Option<String>,

    /// Search term; repeat to replace the default recording terms
    #[arg(long = "term")]
    terms: Vec<String>,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Input JSONL of OpenAlex works
    #[arg(long)]
    input: PathBuf,

    /// Output JSONL of batch results
    #[arg(long)]
    output: PathBuf,

    /// Input lines to skip
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Maximum input lines to process after --start (0 means no limit)
    #[arg(long)]
    max: Option<usize>,

    /// Papers per API call
    #[arg(long, default_value_t = defaults::BATCH_SIZE)]
    batch_size: usize,

    /// Parallel API calls
    #[arg(long, default_value_t = defaults::CONCURRENCY)]
    concurrency: usize,

    /// Calls admitted per 60 s window
    #[arg(long, default_value_t = defaults::CALLS_PER_MINUTE)]
    calls_per_minute: usize,

    /// Abort if more batches than this are planned
    #[arg(long, default_value_t = defaults::DAILY_CALL_CAP)]
    daily_call_cap: usize,

    /// Attempts per batch
    #[arg(long, default_value_t = defaults::MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..))]
    max_retries: u32,

    /// Append to --output and skip batches it already covers
    #[arg(long)]
    resume: bool,

    /// OpenRouter model slug
    #[arg(long, default_value = defaults::MODEL)]
    model: String,

    /// JSON table of model-specific request options (replaces the built-in table)
    #[arg(long)]
    model_options: Option<PathBuf>,

    /// OpenRouter API base URL
    #[arg(long, default_value = api::OPENROUTER_API)]
    base_url: String,

    /// OpenRouter API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Args, Debug)]
struct TrendsArgs {
    /// Curated dataset CSV
    #[arg(long, default_value = "neural_recording_papers.csv")]
    data: PathBuf,

    /// Directory for data.json, summary.json and report.md
    #[arg(long, default_value = "public")]
    out_dir: PathBuf,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr)).init();
    }
}

async fn search(args: SearchArgs) -> anyhow::Result<()> {
    let mut query = WorkQuery::recording_defaults();
    query.start_date = args.start_date;
    query.per_page = args.per_page;
    query.max_results = args.max_results;
    if args.no_default_filters {
        query.source_id = None;
        query.concept_id = None;
    }
    if args.source_id.is_some() {
        query.source_id = args.source_id;
    }
    if args.concept_id.is_some() {
        query.concept_id = args.concept_id;
    }
    if !args.terms.is_empty() {
        query.search = build_search_query(args.terms.as_slice());
    }

    let output = args.output.unwrap_or_else(harvest::default_output_path);
    tracing::info!(search = %query.search, filter = %query.filter(), output = %output.display(), "Searching OpenAlex");

    let client = OpenAlexClient::new(OpenAlexConfig::new(args.mailto))?;
    let summary = harvest::harvest(&client, &query, &output).await?;

    println!(
        "Saved {} works to {} ({} bytes)",
        summary.written,
        summary.path.display(),
        summary.bytes
    );
    Ok(())
}

async fn classify(args: ClassifyArgs) -> anyhow::Result<()> {
    let api_key = require_credential(args.api_key.or_else(ClassifierConfig::api_key_from_env))?;

    let options = match &args.model_options {
        Some(path) => ModelOptionsTable::from_file(path)
            .with_context(|| format!("loading model options from {}", path.display()))?,
        None => ModelOptionsTable::builtin(),
    };

    let mut config = ClassifierConfig::new(api_key, args.model);
    config.base_url = args.base_url;
    config.max_retries = args.max_retries;

    let limiter = Arc::new(SlidingWindowLimiter::per_minute(args.calls_per_minute));
    let client = OpenRouterClient::new(config, &options, limiter)?;

    let mut run = PipelineConfig::new(args.input, args.output);
    run.start = args.start;
    run.max = args.max;
    run.batch_size = args.batch_size;
    run.concurrency = args.concurrency;
    run.daily_call_cap = args.daily_call_cap;
    run.resume = args.resume;
    let output = run.output.clone();

    tracing::info!(model = client.model(), config = ?run, "Starting classification run");
    let summary = Pipeline::new(run, Arc::new(client)).run().await?;

    println!(
        "Wrote {} input papers across {} batches to {}",
        summary.inputs_written,
        summary.batches_processed,
        output.display()
    );
    if summary.batches_skipped > 0 {
        println!("Skipped {} batches already present in the output", summary.batches_skipped);
    }
    Ok(())
}

fn build_trends(args: &TrendsArgs) -> anyhow::Result<()> {
    let files = trends::build_site(&args.data, &args.out_dir)?;
    println!("Wrote {}", files.report.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting neurotrends");

    match cli.command {
        Command::Search(args) => search(args).await,
        Command::Classify(args) => classify(args).await,
        Command::Trends(args) => build_trends(&args),
    }
}
