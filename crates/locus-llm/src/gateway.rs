//! [`Gateway`]: the configured provider behind one `CompletionClient`.

use std::time::Duration;

use locus_core::completion::{Completion, CompletionClient, CompletionRequest};
use reqwest::Client;

use crate::{
  AnthropicClient, ChatCompletionsClient,
  error::{CallError, ConfigError},
  settings::{LlmSettings, ProviderKind},
};

/// Whichever adapter the settings selected.
#[derive(Debug, Clone)]
pub enum Gateway {
  Chat(ChatCompletionsClient),
  Anthropic(AnthropicClient),
}

impl Gateway {
  /// Build the configured adapter. Returns `Ok(None)` when no provider is
  /// set, which callers treat as a dry run.
  pub fn from_settings(settings: &LlmSettings) -> Result<Option<Self>, ConfigError> {
    let Some(kind) = settings.provider_kind()? else {
      return Ok(None);
    };

    let api_key = settings
      .api_key
      .as_deref()
      .map(str::trim)
      .filter(|k| !k.is_empty())
      .ok_or(ConfigError::MissingApiKey(kind.as_str()))?;

    let http = Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()?;

    let gateway = match kind {
      ProviderKind::OpenAi | ProviderKind::Perplexity => {
        let mut client = ChatCompletionsClient::new(kind, api_key, http);
        if let Some(model) = &settings.model {
          client = client.with_model(model);
        }
        if let Some(endpoint) = &settings.endpoint {
          client = client.with_endpoint(endpoint);
        }
        if let Some(prompt) = &settings.system_prompt {
          client = client.with_system_prompt(prompt);
        }
        Self::Chat(client)
      }
      ProviderKind::Anthropic => {
        let mut client = AnthropicClient::new(api_key, http);
        if let Some(model) = &settings.model {
          client = client.with_model(model);
        }
        if let Some(endpoint) = &settings.endpoint {
          client = client.with_endpoint(endpoint);
        }
        if let Some(prompt) = &settings.system_prompt {
          client = client.with_system_prompt(prompt);
        }
        Self::Anthropic(client)
      }
    };

    tracing::info!(provider = gateway.provider(), model = gateway.model(), "LLM provider configured");
    Ok(Some(gateway))
  }

  pub fn model(&self) -> &str {
    match self {
      Self::Chat(c) => c.model(),
      Self::Anthropic(c) => c.model(),
    }
  }
}

impl CompletionClient for Gateway {
  type Error = CallError;

  fn provider(&self) -> &str {
    match self {
      Self::Chat(c) => c.provider(),
      Self::Anthropic(c) => c.provider(),
    }
  }

  async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CallError> {
    match self {
      Self::Chat(c) => c.complete(request).await,
      Self::Anthropic(c) => c.complete(request).await,
    }
  }
}
