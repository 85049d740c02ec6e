//! Composite per-business metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::facts::{BudgetBand, SizeClass};

/// Label assigned when no spatial signal applies.
pub const FALLBACK_GEO_LABEL: &str = "other";

/// Metric values computed by the engine, before the store stamps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetrics {
  pub business_id:                 String,
  /// Same-category businesses within the density radius.
  pub density_neighbors:           u32,
  pub density_score:               f64,
  pub geo_label:                   String,
  /// Which signal produced `geo_label` (`anchor`, `zone:<label>`, ...).
  pub geo_source:                  String,
  pub size_class:                  Option<SizeClass>,
  pub is_chain:                    Option<bool>,
  pub ad_budget_band:              Option<BudgetBand>,
  pub umbrella_affinity:           Option<f64>,
  pub digital_presence:            f64,
  pub digital_presence_confidence: f64,
  pub marketing_attitude:          Option<f64>,
  pub facts_confidence:            Option<f64>,
}

/// A persisted metrics row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessMetrics {
  #[serde(flatten)]
  pub values:     NewMetrics,
  pub updated_at: DateTime<Utc>,
}
