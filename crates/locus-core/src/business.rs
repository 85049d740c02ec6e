//! Business entities, the read-only input rows produced by the upstream
//! point-of-interest import.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lon: f64,
}

impl GeoPoint {
  pub fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }
}

/// A business as delivered by the ingestion collaborator.
///
/// The pipeline never mutates these rows; it only reads them to build
/// snapshots, prompts and metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessEntity {
  pub business_id:       String,
  pub name:              Option<String>,
  pub category:          Option<String>,
  /// Cleaned street address, if the import produced one.
  pub address:           Option<String>,
  /// Address exactly as formatted by the map provider.
  pub formatted_address: Option<String>,
  pub city:              Option<String>,
  pub location:          Option<GeoPoint>,
  pub has_phone:         bool,
  pub has_website:       bool,
  /// Declared opening time per week, in minutes.
  pub weekly_minutes:    Option<u32>,
  /// Provider category tags, most specific first.
  #[serde(default)]
  pub types:             Vec<String>,
  /// Free-form map tags (`addr:city`, `brand`, `contact:instagram`, ...).
  #[serde(default)]
  pub tags:              BTreeMap<String, String>,
  /// Category in the external map taxonomy (e.g. `amenity`).
  pub external_category: Option<String>,
  /// Subtype in the external map taxonomy (e.g. `restaurant`).
  pub external_subtype:  Option<String>,
}

impl BusinessEntity {
  /// Convenience constructor with every optional field empty.
  pub fn new(business_id: impl Into<String>) -> Self {
    Self { business_id: business_id.into(), ..Self::default() }
  }

  /// Look up a tag, treating blank values as absent.
  pub fn tag(&self, key: &str) -> Option<&str> {
    self
      .tags
      .get(key)
      .map(|v| v.trim())
      .filter(|v| !v.is_empty())
  }
}
