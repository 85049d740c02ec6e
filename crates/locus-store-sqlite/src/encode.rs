//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that SQL string comparison orders them correctly. Structured
//! fields are stored as compact JSON. UUIDs are hyphenated lowercase strings.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use locus_core::{
  business::{BusinessEntity, GeoPoint},
  facts::{BudgetBand, BusinessFacts, SizeClass},
  metrics::{BusinessMetrics, NewMetrics},
  request::{EnrichmentRequest, EnrichmentResponse, RequestStatus},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

fn decode_size(s: Option<String>) -> Result<Option<SizeClass>> {
  Ok(s.as_deref().map(str::parse::<SizeClass>).transpose()?)
}

fn decode_band(s: Option<String>) -> Result<Option<BudgetBand>> {
  Ok(s.as_deref().map(str::parse::<BudgetBand>).transpose()?)
}

fn decode_json_opt(s: Option<String>) -> Result<Option<serde_json::Value>> {
  Ok(s.as_deref().map(serde_json::from_str).transpose()?)
}

// ─── Businesses ──────────────────────────────────────────────────────────────

/// Column list matching [`RawBusiness::from_row`], prefixed with `b.`.
pub const BUSINESS_COLUMNS: &str = "
  b.business_id, b.name, b.category, b.address, b.formatted_address, b.city,
  b.latitude, b.longitude, b.has_phone, b.has_website, b.weekly_minutes,
  b.types, b.tags, b.external_category, b.external_subtype";

/// Number of columns in [`BUSINESS_COLUMNS`].
pub const BUSINESS_COLUMN_COUNT: usize = 15;

/// Raw values read directly from a `businesses` row.
pub struct RawBusiness {
  pub business_id:       String,
  pub name:              Option<String>,
  pub category:          Option<String>,
  pub address:           Option<String>,
  pub formatted_address: Option<String>,
  pub city:              Option<String>,
  pub latitude:          Option<f64>,
  pub longitude:         Option<f64>,
  pub has_phone:         bool,
  pub has_website:       bool,
  pub weekly_minutes:    Option<u32>,
  pub types:             String,
  pub tags:              String,
  pub external_category: Option<String>,
  pub external_subtype:  Option<String>,
}

impl RawBusiness {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      business_id:       row.get(0)?,
      name:              row.get(1)?,
      category:          row.get(2)?,
      address:           row.get(3)?,
      formatted_address: row.get(4)?,
      city:              row.get(5)?,
      latitude:          row.get(6)?,
      longitude:         row.get(7)?,
      has_phone:         row.get(8)?,
      has_website:       row.get(9)?,
      weekly_minutes:    row.get(10)?,
      types:             row.get(11)?,
      tags:              row.get(12)?,
      external_category: row.get(13)?,
      external_subtype:  row.get(14)?,
    })
  }

  pub fn into_business(self) -> Result<BusinessEntity> {
    let types: Vec<String> = serde_json::from_str(&self.types)?;
    let tags: BTreeMap<String, String> = serde_json::from_str(&self.tags)?;
    let location = match (self.latitude, self.longitude) {
      (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
      _ => None,
    };
    Ok(BusinessEntity {
      business_id: self.business_id,
      name: self.name,
      category: self.category,
      address: self.address,
      formatted_address: self.formatted_address,
      city: self.city,
      location,
      has_phone: self.has_phone,
      has_website: self.has_website,
      weekly_minutes: self.weekly_minutes,
      types,
      tags,
      external_category: self.external_category,
      external_subtype: self.external_subtype,
    })
  }
}

// ─── Requests ────────────────────────────────────────────────────────────────

pub const REQUEST_COLUMNS: &str = "
  request_id, business_id, provider, input_hash, input_payload, status, error,
  created_at, started_at, finished_at";

pub struct RawRequest {
  pub request_id:    String,
  pub business_id:   String,
  pub provider:      String,
  pub input_hash:    String,
  pub input_payload: String,
  pub status:        String,
  pub error:         Option<String>,
  pub created_at:    String,
  pub started_at:    String,
  pub finished_at:   Option<String>,
}

impl RawRequest {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:    row.get(0)?,
      business_id:   row.get(1)?,
      provider:      row.get(2)?,
      input_hash:    row.get(3)?,
      input_payload: row.get(4)?,
      status:        row.get(5)?,
      error:         row.get(6)?,
      created_at:    row.get(7)?,
      started_at:    row.get(8)?,
      finished_at:   row.get(9)?,
    })
  }

  pub fn into_request(self) -> Result<EnrichmentRequest> {
    Ok(EnrichmentRequest {
      request_id:    decode_uuid(&self.request_id)?,
      business_id:   self.business_id,
      provider:      self.provider,
      input_hash:    self.input_hash,
      input_payload: serde_json::from_str(&self.input_payload)?,
      status:        self.status.parse::<RequestStatus>()?,
      error:         self.error,
      created_at:    decode_dt(&self.created_at)?,
      started_at:    decode_dt(&self.started_at)?,
      finished_at:   decode_opt_dt(self.finished_at)?,
    })
  }
}

// ─── Responses ───────────────────────────────────────────────────────────────

pub struct RawResponse {
  pub response_id:       String,
  pub request_id:        String,
  pub model:             Option<String>,
  pub raw_response:      String,
  pub parsed_response:   String,
  pub prompt_tokens:     Option<u32>,
  pub completion_tokens: Option<u32>,
  pub cost_cents:        Option<f64>,
  pub created_at:        String,
}

impl RawResponse {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      response_id:       row.get(0)?,
      request_id:        row.get(1)?,
      model:             row.get(2)?,
      raw_response:      row.get(3)?,
      parsed_response:   row.get(4)?,
      prompt_tokens:     row.get(5)?,
      completion_tokens: row.get(6)?,
      cost_cents:        row.get(7)?,
      created_at:        row.get(8)?,
    })
  }

  pub fn into_response(self) -> Result<EnrichmentResponse> {
    Ok(EnrichmentResponse {
      response_id:       decode_uuid(&self.response_id)?,
      request_id:        decode_uuid(&self.request_id)?,
      model:             self.model,
      raw_response:      serde_json::from_str(&self.raw_response)?,
      parsed_response:   serde_json::from_str(&self.parsed_response)?,
      prompt_tokens:     self.prompt_tokens,
      completion_tokens: self.completion_tokens,
      cost_cents:        self.cost_cents,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

/// Column list matching [`RawFacts::from_row`], prefixed with `bf.`.
pub const FACTS_COLUMNS: &str = "
  bf.business_id, bf.size_class, bf.is_chain, bf.website_url, bf.social,
  bf.marketing_attitude, bf.umbrella_affinity, bf.ad_budget_band,
  bf.budget_source, bf.confidence, bf.provenance, bf.source_provider,
  bf.source_model, bf.updated_at";

pub struct RawFacts {
  pub business_id:        String,
  pub size_class:         Option<String>,
  pub is_chain:           Option<bool>,
  pub website_url:        Option<String>,
  pub social:             String,
  pub marketing_attitude: Option<f64>,
  pub umbrella_affinity:  Option<f64>,
  pub ad_budget_band:     Option<String>,
  pub budget_source:      Option<String>,
  pub confidence:         Option<f64>,
  pub provenance:         Option<String>,
  pub source_provider:    Option<String>,
  pub source_model:       Option<String>,
  pub updated_at:         String,
}

impl RawFacts {
  /// Read a facts row starting at column `offset`. Returns `None` when the
  /// row came from a LEFT JOIN with no match.
  pub fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Self>> {
    let business_id: Option<String> = row.get(offset)?;
    let Some(business_id) = business_id else {
      return Ok(None);
    };
    Ok(Some(Self {
      business_id,
      size_class:         row.get(offset + 1)?,
      is_chain:           row.get(offset + 2)?,
      website_url:        row.get(offset + 3)?,
      social:             row.get(offset + 4)?,
      marketing_attitude: row.get(offset + 5)?,
      umbrella_affinity:  row.get(offset + 6)?,
      ad_budget_band:     row.get(offset + 7)?,
      budget_source:      row.get(offset + 8)?,
      confidence:         row.get(offset + 9)?,
      provenance:         row.get(offset + 10)?,
      source_provider:    row.get(offset + 11)?,
      source_model:       row.get(offset + 12)?,
      updated_at:         row.get(offset + 13)?,
    }))
  }

  pub fn into_facts(self) -> Result<BusinessFacts> {
    Ok(BusinessFacts {
      business_id:        self.business_id,
      size_class:         decode_size(self.size_class)?,
      is_chain:           self.is_chain,
      website_url:        self.website_url,
      social:             serde_json::from_str(&self.social)?,
      marketing_attitude: self.marketing_attitude,
      umbrella_affinity:  self.umbrella_affinity,
      ad_budget_band:     decode_band(self.ad_budget_band)?,
      budget_source:      self.budget_source,
      confidence:         self.confidence,
      provenance:         decode_json_opt(self.provenance)?,
      source_provider:    self.source_provider,
      source_model:       self.source_model,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

pub const METRICS_COLUMNS: &str = "
  business_id, density_neighbors, density_score, geo_label, geo_source,
  size_class, is_chain, ad_budget_band, umbrella_affinity, digital_presence,
  digital_presence_confidence, marketing_attitude, facts_confidence, updated_at";

pub struct RawMetrics {
  pub business_id:                 String,
  pub density_neighbors:           u32,
  pub density_score:               f64,
  pub geo_label:                   String,
  pub geo_source:                  String,
  pub size_class:                  Option<String>,
  pub is_chain:                    Option<bool>,
  pub ad_budget_band:              Option<String>,
  pub umbrella_affinity:           Option<f64>,
  pub digital_presence:            f64,
  pub digital_presence_confidence: f64,
  pub marketing_attitude:          Option<f64>,
  pub facts_confidence:            Option<f64>,
  pub updated_at:                  String,
}

impl RawMetrics {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      business_id:                 row.get(0)?,
      density_neighbors:           row.get(1)?,
      density_score:               row.get(2)?,
      geo_label:                   row.get(3)?,
      geo_source:                  row.get(4)?,
      size_class:                  row.get(5)?,
      is_chain:                    row.get(6)?,
      ad_budget_band:              row.get(7)?,
      umbrella_affinity:           row.get(8)?,
      digital_presence:            row.get(9)?,
      digital_presence_confidence: row.get(10)?,
      marketing_attitude:          row.get(11)?,
      facts_confidence:            row.get(12)?,
      updated_at:                  row.get(13)?,
    })
  }

  pub fn into_metrics(self) -> Result<BusinessMetrics> {
    Ok(BusinessMetrics {
      values:     NewMetrics {
        business_id:                 self.business_id,
        density_neighbors:           self.density_neighbors,
        density_score:               self.density_score,
        geo_label:                   self.geo_label,
        geo_source:                  self.geo_source,
        size_class:                  decode_size(self.size_class)?,
        is_chain:                    self.is_chain,
        ad_budget_band:              decode_band(self.ad_budget_band)?,
        umbrella_affinity:           self.umbrella_affinity,
        digital_presence:            self.digital_presence,
        digital_presence_confidence: self.digital_presence_confidence,
        marketing_attitude:          self.marketing_attitude,
        facts_confidence:            self.facts_confidence,
      },
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
