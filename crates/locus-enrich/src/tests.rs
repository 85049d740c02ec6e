//! Runner and orchestrator against an in-memory `SqliteStore` and a scripted
//! provider.

use std::{
  collections::HashMap,
  sync::atomic::{AtomicUsize, Ordering},
};

use locus_core::{
  business::{BusinessEntity, GeoPoint},
  completion::{Completion, CompletionClient, CompletionRequest},
  facts::SizeClass,
  request::RequestStatus,
  store::EnrichmentStore,
};
use locus_metrics::MetricsEngine;
use locus_store_sqlite::SqliteStore;
use serde_json::json;

use crate::{
  EnrichmentRunner, EnrichmentSettings, Error, JobRegistry, JobStatus, Orchestrator,
  RefreshOptions, RunOptions, StopReason,
  jobs::{ENRICHMENT_JOB, METRICS_JOB},
};

// ─── Scripted provider ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("fake call failed: {0}")]
struct FakeError(String);

enum Reply {
  Text(&'static str),
  Fail(&'static str),
}

/// Answers by business name; anything unscripted gets `default`.
struct FakeClient {
  replies: HashMap<&'static str, Reply>,
  default: &'static str,
  calls:   AtomicUsize,
}

const GOOD_REPLY: &str = r#"{
  "size_class": "small",
  "is_chain": false,
  "website_url": "bar.example",
  "social": { "instagram": "https://instagram.com/bar" },
  "confidence": 0.7
}"#;

impl FakeClient {
  fn new() -> Self {
    Self { replies: HashMap::new(), default: GOOD_REPLY, calls: AtomicUsize::new(0) }
  }

  fn reply(mut self, name: &'static str, reply: Reply) -> Self {
    self.replies.insert(name, reply);
    self
  }

  fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl CompletionClient for FakeClient {
  type Error = FakeError;

  fn provider(&self) -> &str { "fake" }

  async fn complete(&self, request: &CompletionRequest) -> Result<Completion, FakeError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let scripted = self
      .replies
      .iter()
      .find(|(name, _)| request.prompt.contains(&format!("- Name: {name}\n")))
      .map(|(_, reply)| reply);

    let text = match scripted {
      Some(Reply::Fail(message)) => return Err(FakeError((*message).to_owned())),
      Some(Reply::Text(text)) => *text,
      None => self.default,
    };
    Ok(Completion {
      text:              text.to_owned(),
      model:             Some("fake-1".into()),
      prompt_tokens:     Some(100),
      completion_tokens: Some(20),
      cost_cents:        None,
      raw:               json!({ "scripted": true }),
    })
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

async fn store_with(ids: &[&str]) -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  for id in ids {
    s.put_business(BusinessEntity {
      name: Some(format!("Bar {id}")),
      category: Some("bar".into()),
      city: Some("Torino".into()),
      location: Some(GeoPoint::new(45.07, 7.68)),
      ..BusinessEntity::new(*id)
    })
    .await
    .unwrap();
  }
  s
}

fn settings() -> EnrichmentSettings {
  EnrichmentSettings { request_delay_ms: 0, ..EnrichmentSettings::default() }
}

fn orchestrator<'a>(
  s: &'a SqliteStore,
  client: &'a FakeClient,
  settings: &'a EnrichmentSettings,
  engine: &'a MetricsEngine,
  jobs: JobRegistry,
) -> Orchestrator<'a, SqliteStore, FakeClient> {
  Orchestrator::new(s, EnrichmentRunner::new(s, Some(client), settings), engine, jobs)
}

// ─── Runner ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_enrichment_commits_facts() {
  let s = store_with(&["a"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let runner = EnrichmentRunner::new(&s, Some(&client), &settings);

  let summary = runner.run(RunOptions::default()).await.unwrap();
  assert_eq!(summary.selected, 1);
  assert_eq!(summary.completed, 1);

  let facts = s.get_facts("a").await.unwrap().expect("facts for a");
  assert_eq!(facts.size_class, Some(SizeClass::Small));
  assert_eq!(facts.website_url.as_deref(), Some("https://bar.example/"));
  assert_eq!(facts.source_provider.as_deref(), Some("fake"));
  assert_eq!(facts.source_model.as_deref(), Some("fake-1"));

  let requests = s.list_requests("a").await.unwrap();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].status, RequestStatus::Completed);
  assert_eq!(requests[0].input_payload["name"], "Bar a");
  let responses = s.list_responses(requests[0].request_id).await.unwrap();
  assert_eq!(responses.len(), 1);
  assert_eq!(responses[0].prompt_tokens, Some(100));
}

#[tokio::test]
async fn failures_are_isolated_per_business() {
  let s = store_with(&["a", "b", "c"]).await;
  let client = FakeClient::new()
    .reply("Bar a", Reply::Text("[1, 2]"))
    .reply("Bar b", Reply::Fail("connection reset"));
  let settings = settings();
  let runner = EnrichmentRunner::new(&s, Some(&client), &settings);

  let summary = runner.run(RunOptions::default()).await.unwrap();
  assert_eq!(client.calls(), 3);
  assert_eq!((summary.completed, summary.failed), (1, 2));

  assert!(s.get_facts("a").await.unwrap().is_none());
  assert!(s.get_facts("b").await.unwrap().is_none());
  assert!(s.get_facts("c").await.unwrap().is_some());

  let a = &s.list_requests("a").await.unwrap()[0];
  assert_eq!(a.status, RequestStatus::Error);
  assert!(a.error.as_deref().unwrap_or_default().contains("expected a JSON object"));
  assert!(s.list_responses(a.request_id).await.unwrap().is_empty());

  let b = &s.list_requests("b").await.unwrap()[0];
  assert_eq!(b.status, RequestStatus::Error);
  assert!(b.error.as_deref().unwrap_or_default().contains("connection reset"));
}

#[tokio::test]
async fn identical_snapshot_reuses_the_request_row() {
  let s = store_with(&["a"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let runner = EnrichmentRunner::new(&s, Some(&client), &settings);

  runner.run(RunOptions::default()).await.unwrap();
  // Fresh facts: nothing selected without force.
  let idle = runner.run(RunOptions::default()).await.unwrap();
  assert_eq!(idle.selected, 0);

  let forced = RunOptions { force: true, ..RunOptions::default() };
  runner.run(forced).await.unwrap();

  let requests = s.list_requests("a").await.unwrap();
  assert_eq!(requests.len(), 1);
  assert_eq!(s.list_responses(requests[0].request_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_retry_keeps_previous_facts() {
  let s = store_with(&["a"]).await;
  let settings = settings();
  let good = FakeClient::new();
  EnrichmentRunner::new(&s, Some(&good), &settings)
    .run(RunOptions::default())
    .await
    .unwrap();

  let bad = FakeClient::new().reply("Bar a", Reply::Text(r#"{"confidence": 3}"#));
  let forced = RunOptions { force: true, ..RunOptions::default() };
  let summary = EnrichmentRunner::new(&s, Some(&bad), &settings).run(forced).await.unwrap();
  assert_eq!(summary.failed, 1);

  let facts = s.get_facts("a").await.unwrap().expect("facts survive");
  assert_eq!(facts.confidence, Some(0.7));
  assert_eq!(s.list_requests("a").await.unwrap()[0].status, RequestStatus::Error);
}

#[tokio::test]
async fn dry_run_and_missing_provider_write_nothing() {
  let s = store_with(&["a", "b"]).await;
  let settings = settings();

  let client = FakeClient::new();
  let dry = RunOptions { dry_run: true, ..RunOptions::default() };
  let summary = EnrichmentRunner::new(&s, Some(&client), &settings).run(dry).await.unwrap();
  assert_eq!((summary.selected, summary.skipped), (2, 2));
  assert_eq!(client.calls(), 0);

  let summary = EnrichmentRunner::<_, FakeClient>::new(&s, None, &settings)
    .run(RunOptions::default())
    .await
    .unwrap();
  assert_eq!(summary.skipped, 2);

  assert!(s.list_requests("a").await.unwrap().is_empty());
  assert!(s.get_facts("b").await.unwrap().is_none());
}

#[tokio::test]
async fn limit_caps_the_batch() {
  let s = store_with(&["a", "b", "c"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let runner = EnrichmentRunner::new(&s, Some(&client), &settings);

  let summary = runner.run(RunOptions { limit: Some(2), ..RunOptions::default() }).await.unwrap();
  assert_eq!(summary.completed, 2);
  assert!(s.get_facts("c").await.unwrap().is_none());
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_runs_until_backlog_is_cleared() {
  let s = store_with(&["a", "b", "c"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let engine = MetricsEngine::default();
  let jobs = JobRegistry::new();
  let orch = orchestrator(&s, &client, &settings, &engine, jobs.clone());

  let summary = orch
    .refresh(RefreshOptions { limit: Some(2), ..RefreshOptions::default() })
    .await
    .unwrap();
  assert_eq!(summary.batches, 2);
  assert_eq!(summary.enrichment.completed, 3);
  assert_eq!(summary.stop, StopReason::BacklogCleared);
  assert_eq!(summary.metrics_runs, 1);
  assert_eq!(summary.metrics_rows, 3);
  assert_eq!(summary.report.enrichment_candidates, 0);
  assert!(!summary.report.metrics_needed());

  assert_eq!(jobs.state(ENRICHMENT_JOB).status, JobStatus::Ok);
  assert_eq!(jobs.state(METRICS_JOB).status, JobStatus::Ok);
  assert!(s.get_metrics("b").await.unwrap().is_some());
}

#[tokio::test]
async fn refresh_when_up_to_date_does_nothing() {
  let s = store_with(&["a"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let engine = MetricsEngine::default();
  let orch = orchestrator(&s, &client, &settings, &engine, JobRegistry::new());

  orch.refresh(RefreshOptions::default()).await.unwrap();
  let calls = client.calls();

  let again = orch.refresh(RefreshOptions::default()).await.unwrap();
  assert_eq!(again.stop, StopReason::UpToDate);
  assert_eq!(again.batches, 0);
  assert_eq!(again.metrics_runs, 0);
  assert_eq!(client.calls(), calls);

  let always = RefreshOptions { always_metrics: true, ..RefreshOptions::default() };
  assert_eq!(orch.refresh(always).await.unwrap().metrics_runs, 1);
}

#[tokio::test]
async fn refresh_stops_without_progress() {
  let s = store_with(&["a", "b"]).await;
  let client = FakeClient::new()
    .reply("Bar a", Reply::Fail("timeout"))
    .reply("Bar b", Reply::Fail("timeout"));
  let settings = settings();
  let engine = MetricsEngine::default();
  let orch = orchestrator(&s, &client, &settings, &engine, JobRegistry::new());

  let summary = orch.refresh(RefreshOptions::default()).await.unwrap();
  // The second batch has nothing left once both failures are set aside.
  assert_eq!(summary.batches, 2);
  assert_eq!(summary.stop, StopReason::NoProgress);
  assert_eq!(summary.enrichment.failed, 2);
  assert_eq!(client.calls(), 2);
  // Metrics still cover every business, from heuristics alone.
  assert_eq!(summary.metrics_rows, 2);
}

#[tokio::test]
async fn refresh_moves_past_failing_businesses() {
  // "a" and "b" sort ahead of "c" and fill a whole batch.
  let s = store_with(&["a", "b", "c"]).await;
  let client = FakeClient::new()
    .reply("Bar a", Reply::Fail("timeout"))
    .reply("Bar b", Reply::Text("not json"));
  let settings = settings();
  let engine = MetricsEngine::default();
  let orch = orchestrator(&s, &client, &settings, &engine, JobRegistry::new());

  let summary = orch
    .refresh(RefreshOptions { limit: Some(2), ..RefreshOptions::default() })
    .await
    .unwrap();
  assert_eq!(summary.batches, 3);
  assert_eq!(summary.enrichment.completed, 1);
  assert_eq!(summary.enrichment.failed, 2);
  assert_eq!(summary.enrichment.failed_ids, ["a", "b"]);
  assert_eq!(summary.stop, StopReason::NoProgress);
  assert_eq!(summary.report.enrichment_candidates, 2);
  assert!(s.get_facts("c").await.unwrap().is_some());
  assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn refresh_respects_batch_cap() {
  let s = store_with(&["a", "b", "c"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let engine = MetricsEngine::default();
  let orch = orchestrator(&s, &client, &settings, &engine, JobRegistry::new());

  let options = RefreshOptions {
    limit: Some(1),
    max_batches: Some(2),
    metrics_every_batch: true,
    ..RefreshOptions::default()
  };
  let summary = orch.refresh(options).await.unwrap();
  assert_eq!(summary.batches, 2);
  assert_eq!(summary.stop, StopReason::BatchCap);
  assert_eq!(summary.metrics_runs, 2);
  assert_eq!(summary.report.enrichment_candidates, 1);
}

#[tokio::test]
async fn forced_refresh_stops_once_nothing_is_stale() {
  let s = store_with(&["a", "b"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let engine = MetricsEngine::default();
  let orch = orchestrator(&s, &client, &settings, &engine, JobRegistry::new());

  orch.refresh(RefreshOptions::default()).await.unwrap();
  let forced = orch
    .refresh(RefreshOptions { force: true, ..RefreshOptions::default() })
    .await
    .unwrap();
  assert_eq!(forced.batches, 1);
  assert_eq!(forced.enrichment.completed, 2);
  assert_eq!(forced.stop, StopReason::BacklogCleared);
}

#[tokio::test]
async fn dry_run_refresh_only_reports() {
  let s = store_with(&["a"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let engine = MetricsEngine::default();
  let orch = orchestrator(&s, &client, &settings, &engine, JobRegistry::new());

  let summary = orch
    .refresh(RefreshOptions { dry_run: true, ..RefreshOptions::default() })
    .await
    .unwrap();
  assert_eq!(summary.stop, StopReason::DryRun);
  assert_eq!(summary.report.enrichment_candidates, 1);
  assert_eq!(client.calls(), 0);
  assert!(s.get_metrics("a").await.unwrap().is_none());
}

#[tokio::test]
async fn overlapping_jobs_are_rejected() {
  let s = store_with(&["a"]).await;
  let client = FakeClient::new();
  let settings = settings();
  let engine = MetricsEngine::default();
  let jobs = JobRegistry::new();
  let orch = orchestrator(&s, &client, &settings, &engine, jobs.clone());

  let held = jobs.start(METRICS_JOB).unwrap();
  assert!(matches!(orch.recompute_metrics().await, Err(Error::JobAlreadyRunning(_))));
  held.finish::<(), String>(&Ok(()));
  assert_eq!(orch.recompute_metrics().await.unwrap(), 1);

  let held = jobs.start(ENRICHMENT_JOB).unwrap();
  assert!(matches!(
    orch.enrich(RunOptions::default()).await,
    Err(Error::JobAlreadyRunning(_))
  ));
  assert!(s.list_requests("a").await.unwrap().is_empty());
  held.finish::<(), String>(&Ok(()));
}
