//! Text-generation provider adapters for Locus.
//!
//! Every adapter implements [`locus_core::completion::CompletionClient`]. The
//! [`Gateway`] enum picks one from [`LlmSettings`] at startup.

mod anthropic;
mod chat;
mod gateway;
mod http;

pub mod error;
pub mod settings;

pub use anthropic::AnthropicClient;
pub use chat::ChatCompletionsClient;
pub use error::{CallError, ConfigError};
pub use gateway::Gateway;
pub use settings::{LlmSettings, ProviderKind};

/// Providers accept temperatures in [0, 2]; anything else is clamped.
pub(crate) fn clamp_temperature(t: f32) -> f32 {
  if t.is_nan() { 0.0 } else { t.clamp(0.0, 2.0) }
}

#[cfg(test)]
mod tests {
  use super::clamp_temperature;

  #[test]
  fn temperature_is_clamped() {
    assert_eq!(clamp_temperature(-1.0), 0.0);
    assert_eq!(clamp_temperature(0.2), 0.2);
    assert_eq!(clamp_temperature(7.5), 2.0);
    assert_eq!(clamp_temperature(f32::NAN), 0.0);
  }
}
