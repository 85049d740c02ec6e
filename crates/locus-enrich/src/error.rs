//! Error types for `locus-enrich`.

use thiserror::Error;

/// Why a provider response was rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("response is not valid JSON: {0}")]
  NotJson(#[from] serde_json::Error),

  #[error("expected a JSON object, got {0}")]
  NotAnObject(&'static str),

  #[error("invalid field {field}: {reason}")]
  InvalidField { field: String, reason: String },
}

#[derive(Debug, Error)]
pub enum Error {
  /// Network failure, timeout, non-success status or malformed envelope.
  #[error("external call failed: {0}")]
  ExternalCall(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("response schema error: {0}")]
  ResponseSchema(#[from] ValidationError),

  #[error("persistence error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("job {0:?} is already running")]
  JobAlreadyRunning(String),

  #[error("metrics run failed: {0}")]
  Metrics(#[from] locus_metrics::Error),
}

impl Error {
  pub(crate) fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::ExternalCall(Box::new(e))
  }

  pub(crate) fn persistence(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Persistence(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
