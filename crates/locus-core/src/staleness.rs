//! Backlog counts that drive the refresh loop.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessReport {
  /// Businesses with no facts, or facts older than the TTL.
  pub enrichment_candidates: u64,
  /// Businesses with no metrics row.
  pub metrics_missing:       u64,
  /// Businesses whose metrics predate their facts.
  pub metrics_stale:         u64,
}

impl StalenessReport {
  pub fn metrics_needed(&self) -> bool {
    self.metrics_missing + self.metrics_stale > 0
  }
}
