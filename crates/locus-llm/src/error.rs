use thiserror::Error;

/// The single failure kind of a provider call.
///
/// Network errors, timeouts, non-success statuses and malformed envelopes all
/// collapse into this; `message` carries the diagnostic.
#[derive(Debug, Error)]
#[error("{provider} call failed: {message}")]
pub struct CallError {
  pub provider: String,
  pub message:  String,
}

impl CallError {
  pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
    Self { provider: provider.into(), message: message.into() }
  }
}

/// Invalid provider settings, reported at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unsupported LLM provider {0:?}")]
  UnknownProvider(String),

  #[error("an API key is required for provider {0}")]
  MissingApiKey(&'static str),

  #[error("failed to build HTTP client: {0}")]
  Http(#[from] reqwest::Error),
}
