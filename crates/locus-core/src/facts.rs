//! Business facts: the per-business result of a validated enrichment.
//!
//! A facts row is never patched field by field: the latest validated result
//! replaces the whole row.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Coarse size of a business.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
  Micro,
  Small,
  Medium,
  Large,
}

impl SizeClass {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Micro => "micro",
      Self::Small => "small",
      Self::Medium => "medium",
      Self::Large => "large",
    }
  }

  pub fn is_medium_or_large(self) -> bool {
    matches!(self, Self::Medium | Self::Large)
  }
}

impl fmt::Display for SizeClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SizeClass {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "micro" => Ok(Self::Micro),
      "small" => Ok(Self::Small),
      "medium" => Ok(Self::Medium),
      "large" => Ok(Self::Large),
      other => Err(Error::UnknownVariant {
        kind:  "size class",
        value: other.to_owned(),
      }),
    }
  }
}

/// Estimated advertising budget band.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BudgetBand {
  Low,
  Medium,
  High,
}

impl BudgetBand {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
    }
  }
}

impl fmt::Display for BudgetBand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BudgetBand {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "low" => Ok(Self::Low),
      "medium" => Ok(Self::Medium),
      "high" => Ok(Self::High),
      other => Err(Error::UnknownVariant {
        kind:  "budget band",
        value: other.to_owned(),
      }),
    }
  }
}

// ─── Validated provider output ───────────────────────────────────────────────

/// A fact set that has passed schema validation.
///
/// Every field is optional: providers are told to emit `null` rather than
/// guess.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFacts {
  pub size_class:         Option<SizeClass>,
  pub is_chain:           Option<bool>,
  pub website_url:        Option<String>,
  /// Platform name → absolute URL.
  pub social:             BTreeMap<String, String>,
  pub marketing_attitude: Option<f64>,
  pub umbrella_affinity:  Option<f64>,
  pub ad_budget_band:     Option<BudgetBand>,
  pub confidence:         Option<f64>,
  pub provenance:         Option<serde_json::Value>,
  pub notes:              Option<String>,
}

// ─── Stored row ──────────────────────────────────────────────────────────────

/// Where a budget band came from.
pub const BUDGET_SOURCE_LLM: &str = "llm";

/// The persisted facts row for one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessFacts {
  pub business_id:        String,
  pub size_class:         Option<SizeClass>,
  pub is_chain:           Option<bool>,
  pub website_url:        Option<String>,
  pub social:             BTreeMap<String, String>,
  pub marketing_attitude: Option<f64>,
  pub umbrella_affinity:  Option<f64>,
  pub ad_budget_band:     Option<BudgetBand>,
  /// [`BUDGET_SOURCE_LLM`] when the provider supplied the band.
  pub budget_source:      Option<String>,
  pub confidence:         Option<f64>,
  pub provenance:         Option<serde_json::Value>,
  pub source_provider:    Option<String>,
  pub source_model:       Option<String>,
  /// Server-assigned; set on every replacement.
  pub updated_at:         DateTime<Utc>,
}

impl BusinessFacts {
  /// Build the full replacement row for `business_id` from a validated
  /// extraction.
  pub fn from_extracted(
    business_id: impl Into<String>,
    facts: &ExtractedFacts,
    provider: Option<String>,
    model: Option<String>,
    updated_at: DateTime<Utc>,
  ) -> Self {
    Self {
      business_id: business_id.into(),
      size_class: facts.size_class,
      is_chain: facts.is_chain,
      website_url: facts.website_url.clone(),
      social: facts.social.clone(),
      marketing_attitude: facts.marketing_attitude,
      umbrella_affinity: facts.umbrella_affinity,
      ad_budget_band: facts.ad_budget_band,
      budget_source: facts.ad_budget_band.map(|_| BUDGET_SOURCE_LLM.to_owned()),
      confidence: facts.confidence,
      provenance: facts.provenance.clone(),
      source_provider: provider,
      source_model: model,
      updated_at,
    }
  }
}
