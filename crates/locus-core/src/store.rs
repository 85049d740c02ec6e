//! The `EnrichmentStore` trait and supporting query types.
//!
//! Implemented by storage backends (e.g. `locus-store-sqlite`). The enrichment
//! runner, orchestrator and metrics engine depend on this abstraction, never
//! on a concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  business::BusinessEntity,
  completion::Completion,
  facts::{BusinessFacts, ExtractedFacts},
  metrics::{BusinessMetrics, NewMetrics},
  request::{EnrichmentRequest, EnrichmentResponse, NewRequest},
  spatial::{AnchorPoint, RoadSegment, SpatialLayers, Zone},
  staleness::StalenessReport,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`EnrichmentStore::select_candidates`].
#[derive(Debug, Clone)]
pub struct CandidateQuery {
  pub limit:    usize,
  /// Facts older than this many days are due for re-acquisition.
  pub ttl_days: u32,
  /// Drop the staleness predicate entirely.
  pub force:    bool,
  /// Reference time for the TTL cut-off.
  pub as_of:    DateTime<Utc>,
  /// Business ids never returned, whatever their staleness.
  pub exclude:  Vec<String>,
}

impl CandidateQuery {
  pub fn new(limit: usize, ttl_days: u32) -> Self {
    Self { limit, ttl_days, force: false, as_of: Utc::now(), exclude: Vec::new() }
  }

  /// Facts updated strictly before this instant are stale.
  pub fn cutoff(&self) -> DateTime<Utc> {
    self.as_of - chrono::Duration::days(i64::from(self.ttl_days))
  }
}

/// A business selected for enrichment, with the freshness of its facts.
#[derive(Debug, Clone)]
pub struct CandidateRow {
  pub business:         BusinessEntity,
  pub facts_updated_at: Option<DateTime<Utc>>,
  pub facts_confidence: Option<f64>,
}

/// Everything the metrics engine needs to know about one business.
#[derive(Debug, Clone)]
pub struct MetricsInput {
  pub business: BusinessEntity,
  pub facts:    Option<BusinessFacts>,
}

/// A validated provider answer ready to be committed.
#[derive(Debug, Clone)]
pub struct RecordedEnrichment {
  pub completion: Completion,
  pub facts:      ExtractedFacts,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Locus storage backend.
///
/// Business rows and spatial layers are owned by the import side; the
/// pipeline only reads them. Facts and metrics rows are replaced wholesale.
pub trait EnrichmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Upstream rows ─────────────────────────────────────────────────────

  /// Insert or replace a business row.
  fn put_business(
    &self,
    business: BusinessEntity,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_business<'a>(
    &'a self,
    business_id: &'a str,
  ) -> impl Future<Output = Result<Option<BusinessEntity>, Self::Error>> + Send + 'a;

  fn put_anchor(
    &self,
    anchor: AnchorPoint,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn put_road(
    &self,
    road: RoadSegment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn put_zone(
    &self,
    zone: Zone,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Staleness and selection ───────────────────────────────────────────

  /// Count the enrichment and metrics backlog as of `as_of`.
  fn staleness(
    &self,
    ttl_days: u32,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<StalenessReport, Self::Error>> + Send + '_;

  /// Businesses due for enrichment, never-enriched first, then stalest, then
  /// by identifier.
  fn select_candidates(
    &self,
    query: CandidateQuery,
  ) -> impl Future<Output = Result<Vec<CandidateRow>, Self::Error>> + Send + '_;

  // ── Requests ──────────────────────────────────────────────────────────

  /// Create the request for (business, input hash), or reset the existing
  /// one to `running` with its error cleared.
  fn upsert_request(
    &self,
    input: NewRequest,
  ) -> impl Future<Output = Result<EnrichmentRequest, Self::Error>> + Send + '_;

  fn get_request(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Option<EnrichmentRequest>, Self::Error>> + Send + '_;

  /// All requests ever made for a business, oldest first.
  fn list_requests<'a>(
    &'a self,
    business_id: &'a str,
  ) -> impl Future<Output = Result<Vec<EnrichmentRequest>, Self::Error>> + Send + 'a;

  /// Atomically append the response audit row, replace the business's facts
  /// and mark the request completed. Nothing is written if any step fails.
  fn complete_request(
    &self,
    request_id: Uuid,
    outcome: RecordedEnrichment,
  ) -> impl Future<Output = Result<BusinessFacts, Self::Error>> + Send + '_;

  /// Mark a request as failed with a truncated message. Facts are untouched.
  fn fail_request<'a>(
    &'a self,
    request_id: Uuid,
    message: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn list_responses(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Vec<EnrichmentResponse>, Self::Error>> + Send + '_;

  // ── Facts and metrics ─────────────────────────────────────────────────

  fn get_facts<'a>(
    &'a self,
    business_id: &'a str,
  ) -> impl Future<Output = Result<Option<BusinessFacts>, Self::Error>> + Send + 'a;

  /// Every business joined with its current facts, ordered by identifier.
  fn metrics_inputs(
    &self,
  ) -> impl Future<Output = Result<Vec<MetricsInput>, Self::Error>> + Send + '_;

  fn spatial_layers(
    &self,
  ) -> impl Future<Output = Result<SpatialLayers, Self::Error>> + Send + '_;

  /// Upsert the whole metrics batch in a single transaction. Returns the
  /// number of rows written.
  fn replace_metrics(
    &self,
    rows: Vec<NewMetrics>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_metrics<'a>(
    &'a self,
    business_id: &'a str,
  ) -> impl Future<Output = Result<Option<BusinessMetrics>, Self::Error>> + Send + 'a;
}
