mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use arrow::util::pretty::pretty_format_batches;
use clap::{Args, Parser, Subcommand};
use quorum_ai::{ClaudeClient, InsightRequestor};
use quorum_core::schema::{practices_to_batch, records_to_batch};
use quorum_core::{AnalyzerConfig, Meeting, ProcessStepRegistry};
use quorum_engine::Analyzer;
use quorum_store::{ComplianceStore, DuckStore, MemoryStore};
use quorum_sync::DocumentClient;
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quorum", version, about = "Process compliance analysis for committee meetings")]
struct Cli {
    /// DuckDB database file. Without it results live in memory for this run only.
    #[arg(long, env = "QUORUM_DB", global = true)]
    db: Option<PathBuf>,

    /// JSON step catalog (array of process steps) merged over the built-in one.
    #[arg(long, env = "QUORUM_STEPS", global = true)]
    steps: Option<PathBuf>,

    /// JSON analyzer configuration.
    #[arg(long, env = "QUORUM_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze meetings against a process type and persist the records.
    Analyze(AnalyzeArgs),
    /// Show the formal step catalog.
    Steps {
        /// Process type to show; all known types when omitted.
        process_type: Option<String>,
    },
    /// Show learned practices for a process type, most frequent first.
    Practices { process_type: String },
    /// Show every stored compliance record.
    Records,
    /// Aggregate scores and the most frequent flags.
    Stats {
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Meeting descriptor files (one meeting object or an array of them).
    #[arg(required_unless_present = "meeting_id")]
    files: Vec<PathBuf>,

    /// Fetch meeting descriptors from the document service by id.
    #[arg(long)]
    meeting_id: Vec<String>,

    #[arg(long, short = 'p')]
    process_type: String,

    /// Document store and extraction service base URL.
    #[arg(long, env = "QUORUM_DOCS_URL")]
    docs_url: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "QUORUM_MODEL", default_value = "claude-sonnet-4-5")]
    model: String,

    /// Insight request timeout in seconds; overrides the config file.
    #[arg(long, env = "QUORUM_INSIGHT_TIMEOUT")]
    insight_timeout: Option<u64>,

    /// Skip narrative insights.
    #[arg(long)]
    no_insight: bool,

    /// Meetings analyzed concurrently.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MeetingFile {
    Many(Vec<Meeting>),
    One(Box<Meeting>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = load_registry(cli.steps.as_deref())?;
    let config = load_config(cli.config.as_deref())?;
    let store = open_store(cli.db.as_deref())?;

    match cli.command {
        Command::Analyze(args) => analyze(args, registry, store, config).await,
        Command::Steps { process_type } => {
            match process_type {
                Some(pt) => display::print_steps(&pt, registry.get_steps(&pt)),
                None => {
                    for pt in registry.process_types() {
                        display::print_steps(pt, registry.get_steps(pt));
                    }
                }
            }
            Ok(())
        }
        Command::Practices { process_type } => {
            let practices = store.practices(&process_type)?;
            if practices.is_empty() {
                println!("No observed practices for {process_type}.");
                return Ok(());
            }
            let batch = practices_to_batch(&practices)?;
            println!("{}", pretty_format_batches(&[batch])?);
            Ok(())
        }
        Command::Records => {
            let records = store.records()?;
            if records.is_empty() {
                println!("No compliance records.");
                return Ok(());
            }
            let batch = records_to_batch(&records)?;
            println!("{}", pretty_format_batches(&[batch])?);
            Ok(())
        }
        Command::Stats { top } => stats(store.as_ref(), top),
    }
}

fn load_registry(path: Option<&Path>) -> anyhow::Result<ProcessStepRegistry> {
    let mut registry = ProcessStepRegistry::builtin();
    if let Some(path) = path {
        let loaded = ProcessStepRegistry::load_json(path)
            .with_context(|| format!("loading step catalog {}", path.display()))?;
        registry.merge(loaded);
    }
    Ok(registry)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalyzerConfig> {
    let Some(path) = path else {
        return Ok(AnalyzerConfig::default());
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing config {}", path.display()))
}

fn open_store(db: Option<&Path>) -> anyhow::Result<Arc<dyn ComplianceStore>> {
    match db {
        Some(path) => {
            let store = DuckStore::open_persistent(path)
                .with_context(|| format!("opening database {}", path.display()))?;
            info!(
                path = %path.display(),
                records = store.records_count()?,
                practices = store.practices_count()?,
                "database opened"
            );
            Ok(Arc::new(store))
        }
        None => {
            warn!("no database configured; results are kept in memory for this run");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn read_meetings(path: &Path) -> anyhow::Result<Vec<Meeting>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed: MeetingFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing meeting descriptor {}", path.display()))?;
    Ok(match parsed {
        MeetingFile::Many(meetings) => meetings,
        MeetingFile::One(meeting) => vec![*meeting],
    })
}

async fn analyze(
    args: AnalyzeArgs,
    registry: ProcessStepRegistry,
    store: Arc<dyn ComplianceStore>,
    mut config: AnalyzerConfig,
) -> anyhow::Result<()> {
    if let Some(secs) = args.insight_timeout {
        config.insight_timeout_secs = secs;
    }
    if args.no_insight {
        config.insights_enabled = false;
    }

    let docs = match args.docs_url {
        Some(url) => Some(Arc::new(
            DocumentClient::new(url).context("building document service client")?,
        )),
        None => None,
    };

    let mut meetings = Vec::new();
    for path in &args.files {
        meetings.extend(read_meetings(path)?);
    }
    if !args.meeting_id.is_empty() {
        let client = docs
            .as_ref()
            .context("--meeting-id needs --docs-url or QUORUM_DOCS_URL")?;
        for id in &args.meeting_id {
            let meeting = client
                .meeting(id)
                .await
                .with_context(|| format!("fetching meeting {id}"))?;
            meetings.push(meeting);
        }
    }

    let mut analyzer = Analyzer::new(registry, store);
    if let Some(client) = &docs {
        analyzer = analyzer
            .with_extractor(client.clone())
            .with_document_source(client.clone());
    }
    if config.insights_enabled {
        match args.api_key {
            Some(key) => {
                let claude = ClaudeClient::new(key, args.model);
                analyzer = analyzer.with_insight(InsightRequestor::from_config(
                    Arc::new(claude),
                    &config,
                ));
            }
            None => info!("ANTHROPIC_API_KEY not set; insights skipped"),
        }
    }
    let analyzer = analyzer.with_config(config);

    info!(
        meetings = meetings.len(),
        process_type = %args.process_type,
        "analysis started"
    );
    let jobs = meetings
        .into_iter()
        .map(|m| (m, args.process_type.clone()))
        .collect();

    let mut failures = 0usize;
    for result in analyzer.analyze_batch(jobs, args.concurrency).await {
        match result {
            Ok(record) => {
                let batch = records_to_batch(std::slice::from_ref(&record))?;
                display::print_record_card(&batch, 0, &record.recommendations)?;
            }
            Err(e) => {
                error!(meeting_id = %e.meeting_id(), error = %e, "analysis failed");
                failures += 1;
            }
        }
    }

    anyhow::ensure!(failures == 0, "{failures} meeting(s) could not be analyzed");
    Ok(())
}

fn stats(store: &dyn ComplianceStore, top: usize) -> anyhow::Result<()> {
    let records = store.records()?;
    println!("Records analyzed:        {}", records.len());
    match store.average_compliance_score()? {
        Some(avg) => println!("Average compliance score: {avg:.3}"),
        None => println!("Average compliance score: -"),
    }
    match store.average_timeline_score()? {
        Some(avg) => println!("Average timeline score:   {avg:.3}"),
        None => println!("Average timeline score:   -"),
    }

    let flags = store.top_flags(top)?;
    if !flags.is_empty() {
        println!();
        println!("Most frequent flags");
        for (flag, count) in flags {
            println!("  {count:>5}  {flag}");
        }
    }
    Ok(())
}
