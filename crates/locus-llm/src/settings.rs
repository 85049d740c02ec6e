//! Provider settings, deserialized from the `[llm]` config section.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Known provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
  OpenAi,
  Perplexity,
  Anthropic,
}

impl ProviderKind {
  /// Name recorded on enrichment requests.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::OpenAi => "openai",
      Self::Perplexity => "perplexity",
      Self::Anthropic => "anthropic",
    }
  }

  pub fn default_model(self) -> &'static str {
    match self {
      Self::OpenAi => "gpt-4o-mini",
      Self::Perplexity => "sonar",
      Self::Anthropic => "claude-3-5-haiku-latest",
    }
  }

  pub fn default_endpoint(self) -> &'static str {
    match self {
      Self::OpenAi => "https://api.openai.com/v1/chat/completions",
      Self::Perplexity => "https://api.perplexity.ai/chat/completions",
      Self::Anthropic => "https://api.anthropic.com/v1/messages",
    }
  }
}

impl FromStr for ProviderKind {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "openai" => Ok(Self::OpenAi),
      "perplexity" | "px" => Ok(Self::Perplexity),
      "anthropic" => Ok(Self::Anthropic),
      _ => Err(ConfigError::UnknownProvider(s.to_owned())),
    }
  }
}

pub const DEFAULT_SYSTEM_PROMPT: &str =
  "You are a local marketing analyst. Always answer with valid JSON only.";

/// `[llm]` section. An unset or blank `provider` disables provider calls.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
  #[serde(default)]
  pub provider:      Option<String>,
  #[serde(default)]
  pub api_key:       Option<String>,
  /// Overrides the provider's default model.
  #[serde(default)]
  pub model:         Option<String>,
  /// Overrides the provider's default endpoint URL.
  #[serde(default)]
  pub endpoint:      Option<String>,
  #[serde(default)]
  pub system_prompt: Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:  u64,
}

fn default_timeout_secs() -> u64 { 60 }

impl Default for LlmSettings {
  fn default() -> Self {
    Self {
      provider:      None,
      api_key:       None,
      model:         None,
      endpoint:      None,
      system_prompt: None,
      timeout_secs:  default_timeout_secs(),
    }
  }
}

impl LlmSettings {
  /// The configured provider, or `None` when calls are disabled.
  pub fn provider_kind(&self) -> Result<Option<ProviderKind>, ConfigError> {
    match self.provider.as_deref().map(str::trim) {
      None | Some("") => Ok(None),
      Some(name) => name.parse().map(Some),
    }
  }
}
