//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use locus_core::{
  Error as CoreError,
  business::{BusinessEntity, GeoPoint},
  completion::Completion,
  facts::{BudgetBand, ExtractedFacts, SizeClass},
  metrics::NewMetrics,
  request::{MAX_ERROR_CHARS, NewRequest, RequestStatus},
  spatial::{AnchorPoint, RoadSegment, Zone},
  store::{CandidateQuery, EnrichmentStore, RecordedEnrichment},
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn business(id: &str) -> BusinessEntity {
  BusinessEntity {
    name: Some(format!("Bar {id}")),
    category: Some("bar".into()),
    city: Some("Torino".into()),
    location: Some(GeoPoint::new(45.07, 7.68)),
    ..BusinessEntity::new(id)
  }
}

fn new_request(business_id: &str, hash: &str) -> NewRequest {
  NewRequest {
    business_id:   business_id.into(),
    provider:      "openai".into(),
    input_hash:    hash.into(),
    input_payload: json!({ "name": business_id }),
  }
}

fn completion() -> Completion {
  Completion {
    text:              "{}".into(),
    model:             Some("gpt-test".into()),
    prompt_tokens:     Some(120),
    completion_tokens: Some(40),
    cost_cents:        None,
    raw:               json!({ "id": "cmpl-1" }),
  }
}

fn facts() -> ExtractedFacts {
  ExtractedFacts {
    size_class: Some(SizeClass::Small),
    is_chain: Some(false),
    website_url: Some("https://bar.example".into()),
    marketing_attitude: Some(0.6),
    umbrella_affinity: Some(0.7),
    ad_budget_band: Some(BudgetBand::Low),
    confidence: Some(0.8),
    ..ExtractedFacts::default()
  }
}

async fn enrich(s: &SqliteStore, business_id: &str, hash: &str, extracted: ExtractedFacts) {
  let req = s.upsert_request(new_request(business_id, hash)).await.unwrap();
  s.complete_request(req.request_id, RecordedEnrichment {
    completion: completion(),
    facts:      extracted,
  })
  .await
  .unwrap();
}

fn metrics_row(business_id: &str) -> NewMetrics {
  NewMetrics {
    business_id:                 business_id.into(),
    density_neighbors:           2,
    density_score:               0.2,
    geo_label:                   "near-anchor".into(),
    geo_source:                  "anchor".into(),
    size_class:                  Some(SizeClass::Small),
    is_chain:                    Some(false),
    ad_budget_band:              Some(BudgetBand::Low),
    umbrella_affinity:           Some(0.7),
    digital_presence:            0.5,
    digital_presence_confidence: 0.6,
    marketing_attitude:          Some(0.6),
    facts_confidence:            Some(0.8),
  }
}

// ─── Businesses ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_and_get_business() {
  let s = store().await;
  let mut b = business("b1");
  b.types = vec!["bar".into(), "cafe".into()];
  b.tags.insert("contact:instagram".into(), "barb1".into());
  s.put_business(b.clone()).await.unwrap();

  let fetched = s.get_business("b1").await.unwrap().unwrap();
  assert_eq!(fetched, b);
  assert!(s.get_business("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn put_business_twice_keeps_dependent_rows() {
  let s = store().await;
  s.put_business(business("b1")).await.unwrap();
  enrich(&s, "b1", "h1", facts()).await;

  let mut renamed = business("b1");
  renamed.name = Some("Renamed".into());
  s.put_business(renamed).await.unwrap();

  let fetched = s.get_business("b1").await.unwrap().unwrap();
  assert_eq!(fetched.name.as_deref(), Some("Renamed"));
  assert!(s.get_facts("b1").await.unwrap().is_some());
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_request_is_idempotent_per_hash() {
  let s = store().await;
  s.put_business(business("b1")).await.unwrap();

  let first = s.upsert_request(new_request("b1", "h1")).await.unwrap();
  assert_eq!(first.status, RequestStatus::Running);
  s.fail_request(first.request_id, "boom").await.unwrap();

  let again = s.upsert_request(new_request("b1", "h1")).await.unwrap();
  assert_eq!(again.request_id, first.request_id);
  assert_eq!(again.created_at, first.created_at);
  assert_eq!(again.status, RequestStatus::Running);
  assert!(again.error.is_none());
  assert!(again.finished_at.is_none());

  let other = s.upsert_request(new_request("b1", "h2")).await.unwrap();
  assert_ne!(other.request_id, first.request_id);
  assert_eq!(s.list_requests("b1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn upsert_request_for_unknown_business_fails() {
  let s = store().await;
  let result = s.upsert_request(new_request("ghost", "h1")).await;
  assert!(matches!(result, Err(Error::Database(_))));
}

#[tokio::test]
async fn complete_request_writes_response_and_facts() {
  let s = store().await;
  s.put_business(business("b1")).await.unwrap();
  let req = s.upsert_request(new_request("b1", "h1")).await.unwrap();

  let stored = s
    .complete_request(req.request_id, RecordedEnrichment {
      completion: completion(),
      facts:      facts(),
    })
    .await
    .unwrap();
  assert_eq!(stored.budget_source.as_deref(), Some("llm"));
  assert_eq!(stored.source_provider.as_deref(), Some("openai"));
  assert_eq!(stored.source_model.as_deref(), Some("gpt-test"));

  let facts_row = s.get_facts("b1").await.unwrap().unwrap();
  assert_eq!(facts_row, stored);

  let request = s.get_request(req.request_id).await.unwrap().unwrap();
  assert_eq!(request.status, RequestStatus::Completed);
  assert!(request.finished_at.is_some());

  let responses = s.list_responses(req.request_id).await.unwrap();
  assert_eq!(responses.len(), 1);
  assert_eq!(responses[0].prompt_tokens, Some(120));
  assert_eq!(responses[0].raw_response, json!({ "id": "cmpl-1" }));
  assert_eq!(responses[0].parsed_response["size_class"], json!("small"));
}

#[tokio::test]
async fn complete_request_replaces_facts_wholesale() {
  let s = store().await;
  s.put_business(business("b1")).await.unwrap();
  enrich(&s, "b1", "h1", facts()).await;

  // Second answer omits most fields; nothing from the first survives.
  let sparse = ExtractedFacts { confidence: Some(0.4), ..ExtractedFacts::default() };
  enrich(&s, "b1", "h2", sparse).await;

  let row = s.get_facts("b1").await.unwrap().unwrap();
  assert_eq!(row.confidence, Some(0.4));
  assert!(row.size_class.is_none());
  assert!(row.website_url.is_none());
  assert!(row.ad_budget_band.is_none());
  assert!(row.budget_source.is_none());
}

#[tokio::test]
async fn complete_unknown_request_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let result = s
    .complete_request(id, RecordedEnrichment { completion: completion(), facts: facts() })
    .await;
  assert!(matches!(result, Err(Error::Core(CoreError::RequestNotFound(found))) if found == id));
}

#[tokio::test]
async fn fail_request_keeps_facts_and_truncates() {
  let s = store().await;
  s.put_business(business("b1")).await.unwrap();
  enrich(&s, "b1", "h1", facts()).await;
  let before = s.get_facts("b1").await.unwrap().unwrap();

  let req = s.upsert_request(new_request("b1", "h2")).await.unwrap();
  let long = "x".repeat(MAX_ERROR_CHARS + 250);
  s.fail_request(req.request_id, &long).await.unwrap();

  let request = s.get_request(req.request_id).await.unwrap().unwrap();
  assert_eq!(request.status, RequestStatus::Error);
  assert_eq!(request.error.unwrap().chars().count(), MAX_ERROR_CHARS);
  assert!(s.list_responses(req.request_id).await.unwrap().is_empty());

  assert_eq!(s.get_facts("b1").await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn fail_unknown_request_is_not_found() {
  let s = store().await;
  let result = s.fail_request(Uuid::new_v4(), "boom").await;
  assert!(matches!(result, Err(Error::Core(CoreError::RequestNotFound(_)))));
}

// ─── Candidate selection ─────────────────────────────────────────────────────

#[tokio::test]
async fn candidates_never_enriched_first_then_by_id() {
  let s = store().await;
  for id in ["c", "a", "b"] {
    s.put_business(business(id)).await.unwrap();
  }
  enrich(&s, "a", "h1", facts()).await;

  // Fresh facts for "a" exclude it.
  let rows = s.select_candidates(CandidateQuery::new(10, 30)).await.unwrap();
  let ids: Vec<_> = rows.iter().map(|r| r.business.business_id.as_str()).collect();
  assert_eq!(ids, ["b", "c"]);
  assert!(rows.iter().all(|r| r.facts_updated_at.is_none()));

  // Forty days on, "a" is stale and sorts after the never-enriched rows.
  let query = CandidateQuery { as_of: Utc::now() + Duration::days(40), ..CandidateQuery::new(10, 30) };
  let rows = s.select_candidates(query).await.unwrap();
  let ids: Vec<_> = rows.iter().map(|r| r.business.business_id.as_str()).collect();
  assert_eq!(ids, ["b", "c", "a"]);
  assert_eq!(rows[2].facts_confidence, Some(0.8));
}

#[tokio::test]
async fn candidates_respect_limit_and_force() {
  let s = store().await;
  for id in ["a", "b", "c"] {
    s.put_business(business(id)).await.unwrap();
    enrich(&s, id, "h1", facts()).await;
  }

  assert!(s.select_candidates(CandidateQuery::new(10, 30)).await.unwrap().is_empty());

  let forced = CandidateQuery { force: true, ..CandidateQuery::new(2, 30) };
  let rows = s.select_candidates(forced).await.unwrap();
  assert_eq!(rows.len(), 2);
  assert!(rows.iter().all(|r| r.facts_updated_at.is_some()));
}

#[tokio::test]
async fn excluded_candidates_are_skipped() {
  let s = store().await;
  for id in ["a", "b", "c"] {
    s.put_business(business(id)).await.unwrap();
  }

  let query = CandidateQuery { exclude: vec!["a".into(), "b".into()], ..CandidateQuery::new(2, 30) };
  let rows = s.select_candidates(query).await.unwrap();
  let ids: Vec<_> = rows.iter().map(|r| r.business.business_id.as_str()).collect();
  assert_eq!(ids, ["c"]);

  let everyone = vec!["a".into(), "b".into(), "c".into()];
  let forced = CandidateQuery { force: true, exclude: everyone, ..CandidateQuery::new(10, 30) };
  assert!(s.select_candidates(forced).await.unwrap().is_empty());
}

#[tokio::test]
async fn stalest_facts_come_first() {
  let s = store().await;
  for id in ["a", "b"] {
    s.put_business(business(id)).await.unwrap();
  }
  enrich(&s, "b", "h1", facts()).await;
  enrich(&s, "a", "h1", facts()).await;

  let forced = CandidateQuery { force: true, ..CandidateQuery::new(10, 30) };
  let rows = s.select_candidates(forced).await.unwrap();
  let ids: Vec<_> = rows.iter().map(|r| r.business.business_id.as_str()).collect();
  assert_eq!(ids, ["b", "a"]);
}

// ─── Staleness ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn staleness_counts_backlog() {
  let s = store().await;
  for id in ["a", "b", "c"] {
    s.put_business(business(id)).await.unwrap();
  }
  enrich(&s, "a", "h1", facts()).await;

  let report = s.staleness(30, Utc::now()).await.unwrap();
  assert_eq!(report.enrichment_candidates, 2);
  assert_eq!(report.metrics_missing, 3);
  assert_eq!(report.metrics_stale, 0);

  s.replace_metrics(vec![metrics_row("a"), metrics_row("b")]).await.unwrap();
  let report = s.staleness(30, Utc::now()).await.unwrap();
  assert_eq!(report.metrics_missing, 1);
  assert_eq!(report.metrics_stale, 0);

  // Facts refreshed after the metrics were written.
  enrich(&s, "a", "h2", facts()).await;
  let report = s.staleness(30, Utc::now()).await.unwrap();
  assert_eq!(report.metrics_stale, 1);
  assert!(report.metrics_needed());

  let later = s.staleness(30, Utc::now() + Duration::days(31)).await.unwrap();
  assert_eq!(later.enrichment_candidates, 3);
}

#[tokio::test]
async fn staleness_of_empty_store_is_zero() {
  let s = store().await;
  let report = s.staleness(30, Utc::now()).await.unwrap();
  assert_eq!(report.enrichment_candidates, 0);
  assert!(!report.metrics_needed());
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_metrics_round_trip() {
  let s = store().await;
  s.put_business(business("a")).await.unwrap();

  assert_eq!(s.replace_metrics(vec![metrics_row("a")]).await.unwrap(), 1);
  let stored = s.get_metrics("a").await.unwrap().unwrap();
  assert_eq!(stored.values, metrics_row("a"));

  let mut changed = metrics_row("a");
  changed.geo_label = "other".into();
  changed.geo_source = "fallback".into();
  s.replace_metrics(vec![changed.clone()]).await.unwrap();
  assert_eq!(s.get_metrics("a").await.unwrap().unwrap().values, changed);
}

#[tokio::test]
async fn replace_metrics_is_all_or_nothing() {
  let s = store().await;
  s.put_business(business("a")).await.unwrap();

  let mut bad = metrics_row("a");
  bad.digital_presence = 1.5;
  let result = s.replace_metrics(vec![metrics_row("a"), bad]).await;
  assert!(matches!(result, Err(Error::OutOfRange { field: "digital_presence", .. })));
  assert!(s.get_metrics("a").await.unwrap().is_none());

  // A foreign-key failure mid-batch rolls back the earlier rows too.
  let result = s.replace_metrics(vec![metrics_row("a"), metrics_row("ghost")]).await;
  assert!(result.is_err());
  assert!(s.get_metrics("a").await.unwrap().is_none());
}

#[tokio::test]
async fn metrics_inputs_join_facts() {
  let s = store().await;
  for id in ["b", "a"] {
    s.put_business(business(id)).await.unwrap();
  }
  enrich(&s, "b", "h1", facts()).await;

  let inputs = s.metrics_inputs().await.unwrap();
  assert_eq!(inputs.len(), 2);
  assert_eq!(inputs[0].business.business_id, "a");
  assert!(inputs[0].facts.is_none());
  assert_eq!(inputs[1].facts.as_ref().and_then(|f| f.size_class), Some(SizeClass::Small));
}

// ─── Spatial layers ──────────────────────────────────────────────────────────

#[tokio::test]
async fn spatial_layers_round_trip() {
  let s = store().await;
  let anchor = AnchorPoint {
    anchor_id: "fuel-1".into(),
    name:      Some("Station".into()),
    location:  GeoPoint::new(45.0, 7.0),
  };
  let road = RoadSegment {
    road_id: "r1".into(),
    class:   "primary".into(),
    path:    vec![GeoPoint::new(45.0, 7.0), GeoPoint::new(45.01, 7.0)],
  };
  let zone = |id: &str, priority| Zone {
    zone_id: id.into(),
    label: "centro".into(),
    kind: Some("center".into()),
    priority,
    polygon: vec![
      GeoPoint::new(45.0, 7.0),
      GeoPoint::new(45.0, 7.1),
      GeoPoint::new(45.1, 7.1),
    ],
  };

  s.put_anchor(anchor.clone()).await.unwrap();
  s.put_road(road.clone()).await.unwrap();
  s.put_zone(zone("z2", 5)).await.unwrap();
  s.put_zone(zone("z1", 9)).await.unwrap();

  let layers = s.spatial_layers().await.unwrap();
  assert_eq!(layers.anchors, vec![anchor]);
  assert_eq!(layers.roads, vec![road]);
  // Ordered by priority, lowest first.
  let zone_ids: Vec<_> = layers.zones.iter().map(|z| z.zone_id.as_str()).collect();
  assert_eq!(zone_ids, ["z2", "z1"]);
}
