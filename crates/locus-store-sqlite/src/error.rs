//! Error type for `locus-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] locus_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A bounded score outside [0, 1] reached the write path.
  #[error("{field} out of range for {business_id}: {value}")]
  OutOfRange {
    business_id: String,
    field:       &'static str,
    value:       f64,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
