//! Enrichment tunables, deserialized from the `[enrichment]` config table.

use serde::Deserialize;

use crate::prompt::PromptVariant;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentSettings {
  /// Candidates per batch.
  pub limit:            usize,
  /// Facts older than this are re-acquired.
  pub ttl_days:         u32,
  /// Part of every input hash; bump it to re-enrich everything.
  pub prompt_version:   u32,
  /// Pause after each successful provider call.
  pub request_delay_ms: u64,
  pub search_radius_m:  u32,
  pub temperature:      f32,
  pub max_tokens:       u32,
  pub prompt_variant:   PromptVariant,
}

impl Default for EnrichmentSettings {
  fn default() -> Self {
    Self {
      limit:            50,
      ttl_days:         30,
      prompt_version:   2,
      request_delay_ms: 1000,
      search_radius_m:  200,
      temperature:      0.2,
      max_tokens:       600,
      prompt_variant:   PromptVariant::default(),
    }
  }
}
