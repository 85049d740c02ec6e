//! Error types for `locus-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown {kind} value: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("enrichment request not found: {0}")]
  RequestNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
