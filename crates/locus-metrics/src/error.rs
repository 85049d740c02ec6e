//! Error type for `locus-metrics`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Loading inputs or writing the batch failed; nothing was committed.
  #[error("metrics store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
