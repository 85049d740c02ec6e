//! Enrichment requests and their append-only response audit trail.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Lifecycle of a request row.
///
/// Transitions are `Running → Completed` and `Running → Error`. A request only
/// returns to `Running` when an identical snapshot is submitted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
  Running,
  Completed,
  Error,
}

impl RequestStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Running => "running",
      Self::Completed => "completed",
      Self::Error => "error",
    }
  }
}

impl fmt::Display for RequestStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RequestStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "running" => Ok(Self::Running),
      "completed" => Ok(Self::Completed),
      "error" => Ok(Self::Error),
      other => Err(Error::UnknownVariant {
        kind:  "request status",
        value: other.to_owned(),
      }),
    }
  }
}

/// Maximum length of the error message stored on a failed request.
pub const MAX_ERROR_CHARS: usize = 500;

/// One logical request per (business, input hash).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
  pub request_id:    Uuid,
  pub business_id:   String,
  pub provider:      String,
  /// SHA-256 hex digest over the normalised snapshot and prompt version.
  pub input_hash:    String,
  pub input_payload: serde_json::Value,
  pub status:        RequestStatus,
  pub error:         Option<String>,
  pub created_at:    DateTime<Utc>,
  pub started_at:    DateTime<Utc>,
  pub finished_at:   Option<DateTime<Utc>>,
}

/// Input to [`crate::store::EnrichmentStore::upsert_request`].
/// Identifiers and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRequest {
  pub business_id:   String,
  pub provider:      String,
  pub input_hash:    String,
  pub input_payload: serde_json::Value,
}

/// Append-only audit row written for every validated provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResponse {
  pub response_id:       Uuid,
  pub request_id:        Uuid,
  pub model:             Option<String>,
  pub raw_response:      serde_json::Value,
  pub parsed_response:   serde_json::Value,
  pub prompt_tokens:     Option<u32>,
  pub completion_tokens: Option<u32>,
  pub cost_cents:        Option<f64>,
  pub created_at:        DateTime<Utc>,
}

/// Truncate an error message to [`MAX_ERROR_CHARS`] characters.
pub fn truncate_error(message: &str) -> String {
  message.chars().take(MAX_ERROR_CHARS).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncation_respects_char_boundaries() {
    let long = "é".repeat(MAX_ERROR_CHARS + 20);
    let cut = truncate_error(&long);
    assert_eq!(cut.chars().count(), MAX_ERROR_CHARS);
  }

  #[test]
  fn status_round_trips_through_str() {
    for status in [
      RequestStatus::Running,
      RequestStatus::Completed,
      RequestStatus::Error,
    ] {
      assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
    }
  }
}
