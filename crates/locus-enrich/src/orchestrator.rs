//! The refresh loop: enrich in batches until the backlog is gone, then make
//! sure metrics are current.

use chrono::Utc;
use locus_core::{completion::CompletionClient, staleness::StalenessReport, store::EnrichmentStore};
use locus_metrics::MetricsEngine;
use serde::Serialize;

use crate::{
  Error, Result,
  jobs::{ENRICHMENT_JOB, JobGuard, JobRegistry, METRICS_JOB},
  runner::{EnrichmentRunner, RunOptions, RunSummary},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
  pub limit:               Option<usize>,
  pub ttl_days:            Option<u32>,
  /// Enrich regardless of staleness.
  pub force:               bool,
  pub max_batches:         Option<u32>,
  /// Recompute metrics after every batch instead of once at the end.
  pub metrics_every_batch: bool,
  /// Recompute metrics even when nothing looks stale.
  pub always_metrics:      bool,
  /// Only report what would run.
  pub dry_run:             bool,
}

/// Why the enrichment loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
  /// Nothing was stale to begin with.
  UpToDate,
  BacklogCleared,
  BatchCap,
  /// A batch selected nothing, or only rendered prompts.
  NoProgress,
  DryRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
  pub batches:      u32,
  pub enrichment:   RunSummary,
  pub metrics_runs: u32,
  pub metrics_rows: usize,
  pub stop:         StopReason,
  /// Backlog after the last step.
  pub report:       StalenessReport,
}

pub struct Orchestrator<'a, S, C> {
  store:   &'a S,
  runner:  EnrichmentRunner<'a, S, C>,
  metrics: &'a MetricsEngine,
  jobs:    JobRegistry,
}

impl<'a, S, C> Orchestrator<'a, S, C>
where
  S: EnrichmentStore,
  C: CompletionClient,
{
  pub fn new(
    store: &'a S,
    runner: EnrichmentRunner<'a, S, C>,
    metrics: &'a MetricsEngine,
    jobs: JobRegistry,
  ) -> Self {
    Self { store, runner, metrics, jobs }
  }

  async fn staleness(&self, ttl_days: u32) -> Result<StalenessReport> {
    let report = self
      .store
      .staleness(ttl_days, Utc::now())
      .await
      .map_err(Error::persistence)?;
    tracing::info!(
      enrichment = report.enrichment_candidates,
      metrics_missing = report.metrics_missing,
      metrics_stale = report.metrics_stale,
      "staleness report"
    );
    Ok(report)
  }

  /// Run one enrichment batch under the enrichment job.
  pub async fn enrich(&self, options: RunOptions) -> Result<RunSummary> {
    let job = self.jobs.start(ENRICHMENT_JOB)?;
    let outcome = self.runner.run(options).await;
    if let Ok(summary) = &outcome {
      job.log(format!(
        "selected {} completed {} failed {} skipped {}",
        summary.selected, summary.completed, summary.failed, summary.skipped
      ));
    }
    job.finish(&outcome);
    outcome
  }

  /// Recompute all metrics under the metrics job.
  pub async fn recompute_metrics(&self) -> Result<usize> {
    let job = self.jobs.start(METRICS_JOB)?;
    let outcome = self.metrics.run(self.store).await.map_err(Error::from);
    if let Ok(rows) = &outcome {
      job.log(format!("wrote {rows} metrics rows"));
    }
    job.finish(&outcome);
    outcome
  }

  pub async fn refresh(&self, options: RefreshOptions) -> Result<RefreshSummary> {
    let ttl_days = options.ttl_days.unwrap_or(self.runner.settings().ttl_days);
    let mut report = self.staleness(ttl_days).await?;

    let should_enrich = options.force || report.enrichment_candidates > 0;
    let mut summary = RefreshSummary {
      batches: 0,
      enrichment: RunSummary::default(),
      metrics_runs: 0,
      metrics_rows: 0,
      stop: StopReason::UpToDate,
      report,
    };

    if options.dry_run {
      let metrics = options.always_metrics || report.metrics_needed() || should_enrich;
      tracing::info!(enrichment = should_enrich, metrics, "dry run, nothing executed");
      summary.stop = StopReason::DryRun;
      return Ok(summary);
    }

    if should_enrich {
      let job = self.jobs.start(ENRICHMENT_JOB)?;
      let outcome = self.enrichment_loop(&job, &options, ttl_days, &mut summary).await;
      job.finish(&outcome);
      outcome?;
      report = summary.report;
    } else {
      tracing::info!("skipping enrichment, data is within TTL");
    }

    let metrics_already_ran = options.metrics_every_batch && summary.batches > 0;
    let run_metrics = options.always_metrics || report.metrics_needed() || summary.batches > 0;
    if run_metrics && !metrics_already_ran {
      summary.metrics_rows = self.recompute_metrics().await?;
      summary.metrics_runs += 1;
      summary.report = self.staleness(ttl_days).await?;
    } else if !run_metrics {
      tracing::info!("skipping metrics, already up to date");
    }

    tracing::info!(
      batches = summary.batches,
      completed = summary.enrichment.completed,
      failed = summary.enrichment.failed,
      metrics_runs = summary.metrics_runs,
      stop = ?summary.stop,
      "refresh finished"
    );
    Ok(summary)
  }

  async fn enrichment_loop(
    &self,
    job: &JobGuard,
    options: &RefreshOptions,
    ttl_days: u32,
    summary: &mut RefreshSummary,
  ) -> Result<()> {
    loop {
      // Businesses that already failed in this refresh would otherwise be
      // selected first again and starve the rest of the backlog.
      let run = RunOptions {
        limit: options.limit,
        ttl_days: Some(ttl_days),
        force: options.force,
        dry_run: false,
        exclude: summary.enrichment.failed_ids.clone(),
      };
      summary.batches += 1;
      let batch = self.runner.run(run).await?;
      summary.enrichment.absorb(&batch);
      job.log(format!(
        "batch {}: selected {} completed {} failed {}",
        summary.batches, batch.selected, batch.completed, batch.failed
      ));

      if options.metrics_every_batch {
        summary.metrics_rows = self.recompute_metrics().await?;
        summary.metrics_runs += 1;
      }
      summary.report = self.staleness(ttl_days).await?;

      // Under force the loop still ends once nothing is stale.
      if summary.report.enrichment_candidates == 0 {
        summary.stop = StopReason::BacklogCleared;
        break;
      }
      if batch.selected == 0 || batch.completed + batch.failed == 0 {
        tracing::warn!(batch = summary.batches, "batch made no progress, stopping");
        summary.stop = StopReason::NoProgress;
        break;
      }
      if options.max_batches.is_some_and(|cap| summary.batches >= cap) {
        summary.stop = StopReason::BatchCap;
        break;
      }
    }
    Ok(())
  }
}
