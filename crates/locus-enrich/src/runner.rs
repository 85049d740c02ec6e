//! One bounded enrichment batch.
//!
//! Candidates are processed sequentially. Every failure is isolated to its
//! business: it is logged, recorded on the request row, and the batch moves
//! on to the next candidate.

use std::time::Duration;

use chrono::Utc;
use locus_core::{
  business::BusinessEntity,
  completion::{CompletionClient, CompletionRequest},
  facts::BusinessFacts,
  request::NewRequest,
  store::{CandidateQuery, EnrichmentStore, RecordedEnrichment},
};
use serde::Serialize;

use crate::{
  Error, Result,
  prompt::build_prompt,
  settings::EnrichmentSettings,
  snapshot::Snapshot,
  validate::parse_facts,
};

/// Characters of the prompt shown per business in a dry run.
const DRY_RUN_SNIPPET_CHARS: usize = 400;

/// Per-invocation overrides on top of [`EnrichmentSettings`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub limit:    Option<usize>,
  pub ttl_days: Option<u32>,
  pub force:    bool,
  /// Log prompts instead of calling the provider. Nothing is written.
  pub dry_run:  bool,
  /// Businesses left out of the selection.
  pub exclude:  Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
  pub selected:  usize,
  pub completed: usize,
  pub failed:    usize,
  /// Candidates only rendered, because of a dry run or a missing provider.
  pub skipped:   usize,
  pub failed_ids: Vec<String>,
}

impl RunSummary {
  pub fn absorb(&mut self, other: &RunSummary) {
    self.selected += other.selected;
    self.completed += other.completed;
    self.failed += other.failed;
    self.skipped += other.skipped;
    self.failed_ids.extend_from_slice(&other.failed_ids);
  }
}

pub struct EnrichmentRunner<'a, S, C> {
  store:    &'a S,
  client:   Option<&'a C>,
  settings: &'a EnrichmentSettings,
}

impl<'a, S, C> EnrichmentRunner<'a, S, C>
where
  S: EnrichmentStore,
  C: CompletionClient,
{
  /// `client` is `None` when no provider is configured; such runs behave
  /// like dry runs.
  pub fn new(store: &'a S, client: Option<&'a C>, settings: &'a EnrichmentSettings) -> Self {
    Self { store, client, settings }
  }

  pub fn settings(&self) -> &EnrichmentSettings { self.settings }

  /// Select up to `limit` candidates and enrich each in turn.
  pub async fn run(&self, options: RunOptions) -> Result<RunSummary> {
    let query = CandidateQuery {
      limit:    options.limit.unwrap_or(self.settings.limit),
      ttl_days: options.ttl_days.unwrap_or(self.settings.ttl_days),
      force:    options.force,
      as_of:    Utc::now(),
      exclude:  options.exclude,
    };
    let candidates = self
      .store
      .select_candidates(query)
      .await
      .map_err(Error::persistence)?;

    let mut summary = RunSummary { selected: candidates.len(), ..RunSummary::default() };
    if candidates.is_empty() {
      tracing::info!("no businesses require enrichment");
      return Ok(summary);
    }

    let dry_run = options.dry_run || self.client.is_none();
    let total = candidates.len();
    tracing::info!(total, dry_run, "processing businesses");

    for (idx, candidate) in candidates.iter().enumerate() {
      let business = &candidate.business;
      tracing::info!(
        business_id = %business.business_id,
        category = business.category.as_deref().unwrap_or("unknown"),
        "enrichment progress {}/{total}",
        idx + 1
      );

      let client = match self.client {
        Some(client) if !dry_run => client,
        _ => {
          self.log_dry_run(business);
          summary.skipped += 1;
          continue;
        }
      };

      match self.enrich_one(client, business).await {
        Ok(facts) => {
          summary.completed += 1;
          tracing::info!(
            business_id = %facts.business_id,
            confidence = ?facts.confidence,
            "facts updated"
          );
          tokio::time::sleep(Duration::from_millis(self.settings.request_delay_ms)).await;
        }
        Err(e) => {
          summary.failed += 1;
          summary.failed_ids.push(business.business_id.clone());
          tracing::warn!(business_id = %business.business_id, error = %e, "enrichment failed");
        }
      }
    }

    tracing::info!(
      completed = summary.completed,
      failed = summary.failed,
      skipped = summary.skipped,
      "enrichment batch finished"
    );
    Ok(summary)
  }

  fn snapshot(&self, business: &BusinessEntity) -> Snapshot {
    Snapshot::capture(business, self.settings.search_radius_m, self.settings.prompt_version)
  }

  fn log_dry_run(&self, business: &BusinessEntity) {
    let prompt = build_prompt(&self.snapshot(business), self.settings.prompt_variant);
    let snippet: String = prompt.chars().take(DRY_RUN_SNIPPET_CHARS).collect();
    tracing::info!(business_id = %business.business_id, "dry run prompt:\n{snippet}");
  }

  /// Open (or reset) the request row, then acquire and commit. A failure
  /// after the request exists is recorded on it.
  async fn enrich_one(&self, client: &C, business: &BusinessEntity) -> Result<BusinessFacts> {
    let snapshot = self.snapshot(business);
    let request = self
      .store
      .upsert_request(NewRequest {
        business_id:   business.business_id.clone(),
        provider:      client.provider().to_owned(),
        input_hash:    snapshot.input_hash(),
        input_payload: snapshot.payload(),
      })
      .await
      .map_err(Error::persistence)?;
    tracing::debug!(request_id = %request.request_id, input_hash = %request.input_hash, "request opened");

    let outcome = match self.acquire(client, &snapshot).await {
      Ok(recorded) => self
        .store
        .complete_request(request.request_id, recorded)
        .await
        .map_err(Error::persistence),
      Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
      if let Err(mark) = self.store.fail_request(request.request_id, &e.to_string()).await {
        tracing::error!(
          request_id = %request.request_id,
          error = %mark,
          "could not mark request as failed"
        );
      }
    }
    outcome
  }

  async fn acquire(&self, client: &C, snapshot: &Snapshot) -> Result<RecordedEnrichment> {
    let request = CompletionRequest {
      prompt:      build_prompt(snapshot, self.settings.prompt_variant),
      temperature: self.settings.temperature,
      max_tokens:  self.settings.max_tokens,
    };
    let completion = client.complete(&request).await.map_err(Error::external)?;
    let facts = parse_facts(&completion.text)?;
    Ok(RecordedEnrichment { completion, facts })
  }
}
