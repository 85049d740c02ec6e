//! Full-table metrics recomputation.
//!
//! [`compute`] is a pure function of business rows, their facts and the
//! spatial layers. [`MetricsEngine::run`] loads those inputs, computes every
//! row, and hands the whole batch to the store in one write.

use locus_core::{
  business::BusinessEntity,
  facts::BusinessFacts,
  metrics::NewMetrics,
  spatial::SpatialLayers,
  store::{EnrichmentStore, MetricsInput},
};
use serde::Deserialize;

use crate::{
  Error, Result,
  geo::{self, LabelRadii},
  rules::{self, normalize_category},
};

/// Tunables for one metrics run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
  /// Radius for counting same-category neighbours.
  pub density_radius_m:   f64,
  /// Neighbour count at which the density score saturates to 1.
  pub density_saturation: u32,
  pub anchor_radius_m:    f64,
  pub road_radius_m:      f64,
}

impl Default for MetricsSettings {
  fn default() -> Self {
    let radii = LabelRadii::default();
    Self {
      density_radius_m:   300.0,
      density_saturation: 10,
      anchor_radius_m:    radii.anchor_m,
      road_radius_m:      radii.road_m,
    }
  }
}

impl MetricsSettings {
  fn radii(&self) -> LabelRadii {
    LabelRadii { anchor_m: self.anchor_radius_m, road_m: self.road_radius_m }
  }
}

// ─── Scores ──────────────────────────────────────────────────────────────────

/// Digital presence score and its confidence, both in [0, 1].
pub fn digital_presence(
  has_website: bool,
  social_count: usize,
  attitude: f64,
  base_confidence: Option<f64>,
) -> (f64, f64) {
  let attitude = attitude.clamp(0.0, 1.0);
  let website = if has_website { 0.4 } else { 0.0 };
  let social = (0.4 * social_count.min(3) as f64 / 3.0).min(0.4);
  let marketing = (0.2 * attitude).min(0.2);
  let score = (website + social + marketing).min(1.0);

  let mut confidence = base_confidence.unwrap_or(0.4).clamp(0.0, 1.0);
  if has_website {
    confidence += 0.1;
  }
  if social_count > 0 {
    confidence += 0.1;
  }
  (score, confidence.min(1.0))
}

fn density_token(b: &BusinessEntity) -> Option<String> {
  normalize_category([b.category.as_deref(), b.external_subtype.as_deref()])
}

/// Same-category neighbours within `radius_m`, excluding the business itself.
fn density_neighbors(index: usize, inputs: &[MetricsInput], tokens: &[Option<String>], radius_m: f64) -> u32 {
  let (Some(token), Some(here)) = (&tokens[index], inputs[index].business.location) else {
    return 0;
  };
  let count = inputs
    .iter()
    .zip(tokens)
    .enumerate()
    .filter(|(i, (_, t))| *i != index && t.as_ref() == Some(token))
    .filter_map(|(_, (other, _))| other.business.location)
    .filter(|there| geo::haversine_m(here, *there) <= radius_m)
    .count();
  u32::try_from(count).unwrap_or(u32::MAX)
}

fn metrics_for(
  b: &BusinessEntity,
  facts: Option<&BusinessFacts>,
  neighbors: u32,
  layers: &SpatialLayers,
  settings: &MetricsSettings,
) -> NewMetrics {
  let resolved = rules::resolve(b, facts);
  let label = geo::classify(b.location, layers, settings.radii());

  // Digital presence only trusts stored facts; heuristics never inflate it.
  let has_website = b.has_website || facts.is_some_and(|f| f.website_url.is_some());
  let stored_social = facts.map_or(0, |f| f.social.len());
  let stored_attitude = facts.and_then(|f| f.marketing_attitude).unwrap_or(0.0);
  let (presence, presence_confidence) = digital_presence(
    has_website,
    stored_social,
    stored_attitude,
    facts.and_then(|f| f.confidence),
  );

  let saturation = f64::from(settings.density_saturation.max(1));
  NewMetrics {
    business_id:                 b.business_id.clone(),
    density_neighbors:           neighbors,
    density_score:               (f64::from(neighbors) / saturation).min(1.0),
    geo_label:                   label.label,
    geo_source:                  label.source,
    size_class:                  Some(resolved.size_class),
    is_chain:                    Some(resolved.is_chain),
    ad_budget_band:              resolved.ad_budget_band,
    umbrella_affinity:           Some(resolved.umbrella_affinity.clamp(0.0, 1.0)),
    digital_presence:            presence,
    digital_presence_confidence: presence_confidence,
    marketing_attitude:          Some(resolved.marketing_attitude.clamp(0.0, 1.0)),
    facts_confidence:            Some(resolved.confidence.clamp(0.0, 1.0)),
  }
}

/// Compute the metrics row for every input, in input order.
pub fn compute(inputs: &[MetricsInput], layers: &SpatialLayers, settings: &MetricsSettings) -> Vec<NewMetrics> {
  let tokens: Vec<Option<String>> = inputs.iter().map(|i| density_token(&i.business)).collect();
  inputs
    .iter()
    .enumerate()
    .map(|(index, input)| {
      let neighbors = density_neighbors(index, inputs, &tokens, settings.density_radius_m);
      metrics_for(&input.business, input.facts.as_ref(), neighbors, layers, settings)
    })
    .collect()
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Recomputes and stores metrics for the whole business table.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
  settings: MetricsSettings,
}

impl MetricsEngine {
  pub fn new(settings: MetricsSettings) -> Self { Self { settings } }

  pub fn settings(&self) -> &MetricsSettings { &self.settings }

  /// Recompute every row. Either the whole batch is written or nothing is.
  pub async fn run<S: EnrichmentStore>(&self, store: &S) -> Result<usize> {
    let inputs = store.metrics_inputs().await.map_err(Error::store)?;
    let layers = store.spatial_layers().await.map_err(Error::store)?;
    tracing::info!(
      businesses = inputs.len(),
      anchors = layers.anchors.len(),
      roads = layers.roads.len(),
      zones = layers.zones.len(),
      "computing metrics"
    );

    let rows = compute(&inputs, &layers, &self.settings);
    let written = store.replace_metrics(rows).await.map_err(Error::store)?;
    tracing::info!(written, "metrics stored");
    Ok(written)
  }
}
