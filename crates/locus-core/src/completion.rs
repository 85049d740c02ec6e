//! The `CompletionClient` capability shared by every text-generation provider.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// One completion call: a rendered prompt plus sampling limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
  pub prompt:      String,
  pub temperature: f32,
  pub max_tokens:  u32,
}

impl CompletionRequest {
  pub fn new(prompt: impl Into<String>) -> Self {
    Self { prompt: prompt.into(), temperature: 0.2, max_tokens: 600 }
  }
}

/// A provider's answer, normalised across envelope shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
  /// The assistant text; expected to hold one JSON object.
  pub text:              String,
  pub model:             Option<String>,
  pub prompt_tokens:     Option<u32>,
  pub completion_tokens: Option<u32>,
  /// Only set when the provider reports a price.
  pub cost_cents:        Option<f64>,
  /// The full response envelope, kept for the audit trail.
  pub raw:               serde_json::Value,
}

/// Abstraction over an external text-generation provider.
///
/// Implementations must not retry; callers decide what a failure means.
pub trait CompletionClient: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Provider name recorded on enrichment requests (e.g. `"openai"`).
  fn provider(&self) -> &str;

  fn complete<'a>(
    &'a self,
    request: &'a CompletionRequest,
  ) -> impl Future<Output = Result<Completion, Self::Error>> + Send + 'a;
}
