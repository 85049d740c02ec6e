//! Normalized input snapshot and its content address.
//!
//! The input hash is a SHA-256 over the `|`-joined snapshot fields plus the
//! prompt version. Identical snapshots under the same version always map to
//! the same enrichment request row.

use std::collections::BTreeMap;

use locus_core::business::BusinessEntity;
use serde::Serialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::resolve::{resolve_address, resolve_city};

/// What the provider is told about one business.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
  pub version:           u32,
  pub business_id:       String,
  pub name:              Option<String>,
  pub category:          Option<String>,
  /// Resolved address (see [`resolve_address`]).
  pub address:           Option<String>,
  /// Resolved city (see [`resolve_city`]).
  pub city:              Option<String>,
  pub formatted_address: Option<String>,
  pub types:             Vec<String>,
  pub tags:              BTreeMap<String, String>,
  pub external_category: Option<String>,
  pub external_subtype:  Option<String>,
  pub has_phone:         bool,
  pub has_website:       bool,
  pub weekly_minutes:    Option<u32>,
  pub latitude:          Option<f64>,
  pub longitude:         Option<f64>,
  pub search_radius_m:   u32,
}

impl Snapshot {
  pub fn capture(business: &BusinessEntity, search_radius_m: u32, version: u32) -> Self {
    let city = resolve_city(business);
    let address = resolve_address(business, city.as_deref());
    Self {
      version,
      business_id: business.business_id.clone(),
      name: business.name.clone(),
      category: business.category.clone(),
      address,
      city,
      formatted_address: business.formatted_address.clone(),
      types: business.types.clone(),
      tags: business.tags.clone(),
      external_category: business.external_category.clone(),
      external_subtype: business.external_subtype.clone(),
      has_phone: business.has_phone,
      has_website: business.has_website,
      weekly_minutes: business.weekly_minutes,
      latitude: business.location.map(|p| p.lat),
      longitude: business.location.map(|p| p.lon),
      search_radius_m,
    }
  }

  /// Content address of this snapshot.
  ///
  /// Stable: tags are a sorted map, so insertion order never matters.
  pub fn input_hash(&self) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let coord = |v: Option<f64>| v.map(|c| c.to_string()).unwrap_or_default();

    let fields = [
      self.business_id.clone(),
      opt(&self.name),
      opt(&self.address),
      opt(&self.city),
      opt(&self.formatted_address),
      opt(&self.category),
      json!(self.types).to_string(),
      json!(self.tags).to_string(),
      coord(self.latitude),
      coord(self.longitude),
      self.search_radius_m.to_string(),
      self.version.to_string(),
    ];

    let mut hasher = Sha256::new();
    hasher.update(fields.join("|").as_bytes());
    hex::encode(hasher.finalize())
  }

  /// The snapshot as stored on the request row.
  pub fn payload(&self) -> Value { json!(self) }
}
