//! `locus`: runs the enrichment and metrics pipeline against a SQLite store.
//!
//! # Usage
//!
//! ```text
//! locus --config locus.toml import businesses.json
//! locus status
//! locus enrich --limit 20 --dry-run
//! locus refresh --max-batches 5 --metrics-every-batch
//! locus metrics
//! ```
//!
//! Every setting can also come from the environment, e.g.
//! `LOCUS__LLM__PROVIDER=openai LOCUS__LLM__API_KEY=... locus refresh`.

mod import;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use locus_core::store::EnrichmentStore;
use locus_enrich::{EnrichmentRunner, JobRegistry, Orchestrator, RefreshOptions, RunOptions};
use locus_llm::Gateway;
use locus_metrics::MetricsEngine;
use locus_store_sqlite::SqliteStore;
use serde::Serialize;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "locus", version, about = "Business fact enrichment and metrics")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "locus.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run one bounded enrichment batch.
  Enrich(EnrichArgs),
  /// Recompute metrics for every business.
  Metrics,
  /// Enrich until nothing is stale, then bring metrics up to date.
  Refresh(RefreshArgs),
  /// Print the staleness report.
  Status {
    #[arg(long)]
    ttl_days: Option<u32>,
  },
  /// Load businesses and spatial layers from a JSON file.
  Import {
    file: PathBuf,
  },
}

#[derive(Args, Debug)]
struct EnrichArgs {
  #[arg(long)]
  limit:    Option<usize>,
  #[arg(long)]
  ttl_days: Option<u32>,
  /// Ignore staleness and select any businesses.
  #[arg(long)]
  force:    bool,
  /// Log prompts without calling the provider or writing anything.
  #[arg(long)]
  dry_run:  bool,
}

#[derive(Args, Debug)]
struct RefreshArgs {
  #[arg(long)]
  limit:               Option<usize>,
  #[arg(long)]
  ttl_days:            Option<u32>,
  #[arg(long)]
  force:               bool,
  #[arg(long)]
  max_batches:         Option<u32>,
  #[arg(long)]
  metrics_every_batch: bool,
  #[arg(long)]
  always_metrics:      bool,
  /// Only report what would run.
  #[arg(long)]
  dry_run:             bool,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  // Provider settings are checked before anything touches the store.
  let gateway = match cli.command {
    Command::Enrich(_) | Command::Refresh(_) => {
      let gateway = Gateway::from_settings(&settings.llm).context("invalid [llm] settings")?;
      if gateway.is_none() {
        tracing::warn!("no LLM provider configured, enrichment will only log prompts");
      }
      gateway
    }
    _ => None,
  };

  let store_path = settings.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {}", store_path.display()))?;

  let engine = MetricsEngine::new(settings.metrics.clone());
  let runner = EnrichmentRunner::new(&store, gateway.as_ref(), &settings.enrichment);
  let orchestrator = Orchestrator::new(&store, runner, &engine, JobRegistry::new());

  match cli.command {
    Command::Enrich(args) => {
      let summary = orchestrator
        .enrich(RunOptions {
          limit:    args.limit,
          ttl_days: args.ttl_days,
          force:    args.force,
          dry_run:  args.dry_run,
          exclude:  Vec::new(),
        })
        .await
        .context("enrichment failed")?;
      print_json(&summary)?;
    }

    Command::Metrics => {
      let rows = orchestrator
        .recompute_metrics()
        .await
        .context("metrics recomputation failed")?;
      print_json(&serde_json::json!({ "rows": rows }))?;
    }

    Command::Refresh(args) => {
      let summary = orchestrator
        .refresh(RefreshOptions {
          limit:               args.limit,
          ttl_days:            args.ttl_days,
          force:               args.force,
          max_batches:         args.max_batches,
          metrics_every_batch: args.metrics_every_batch,
          always_metrics:      args.always_metrics,
          dry_run:             args.dry_run,
        })
        .await
        .context("refresh failed")?;
      print_json(&summary)?;
    }

    Command::Status { ttl_days } => {
      let ttl_days = ttl_days.unwrap_or(settings.enrichment.ttl_days);
      let report = store
        .staleness(ttl_days, Utc::now())
        .await
        .context("failed to compute staleness")?;
      print_json(&serde_json::json!({
        "ttl_days": ttl_days,
        "enrichment_candidates": report.enrichment_candidates,
        "metrics_missing": report.metrics_missing,
        "metrics_stale": report.metrics_stale,
        "metrics_needed": report.metrics_needed(),
      }))?;
    }

    Command::Import { file } => {
      let raw = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
      let doc: import::ImportDocument = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", file.display()))?;
      import::import(&store, doc).await.context("import failed")?;
    }
  }

  Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
