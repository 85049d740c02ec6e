//! Anthropic messages adapter.

use locus_core::completion::{Completion, CompletionClient, CompletionRequest};
use reqwest::{Client, header::CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;

use crate::{
  clamp_temperature,
  error::CallError,
  http::{send_json, usage_count},
  settings::{DEFAULT_SYSTEM_PROMPT, ProviderKind},
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct UserMessage<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Serialize)]
struct MessagesBody<'a> {
  model:       &'a str,
  system:      &'a str,
  messages:    [UserMessage<'a>; 1],
  temperature: f32,
  max_tokens:  u32,
}

/// Client for the Anthropic `/v1/messages` endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
  http:          Client,
  api_key:       String,
  model:         String,
  endpoint:      String,
  system_prompt: String,
}

impl AnthropicClient {
  pub fn new(api_key: impl Into<String>, http: Client) -> Self {
    let kind = ProviderKind::Anthropic;
    Self {
      http,
      api_key: api_key.into(),
      model: kind.default_model().to_owned(),
      endpoint: kind.default_endpoint().to_owned(),
      system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
    }
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = endpoint.into();
    self
  }

  pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
    self.system_prompt = prompt.into();
    self
  }

  pub fn model(&self) -> &str { &self.model }
}

impl CompletionClient for AnthropicClient {
  type Error = CallError;

  fn provider(&self) -> &str { ProviderKind::Anthropic.as_str() }

  async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CallError> {
    let provider = self.provider();
    // The messages API caps temperature at 1.
    let body = MessagesBody {
      model:       &self.model,
      system:      &self.system_prompt,
      messages:    [UserMessage { role: "user", content: &request.prompt }],
      temperature: clamp_temperature(request.temperature).min(1.0),
      max_tokens:  request.max_tokens,
    };

    tracing::debug!(provider, model = %self.model, endpoint = %self.endpoint, "messages request");

    let req = self
      .http
      .post(&self.endpoint)
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", ANTHROPIC_VERSION)
      .header(CONTENT_TYPE, "application/json")
      .json(&body);

    let envelope = send_json(provider, req).await?;
    parse_envelope(provider, envelope)
  }
}

/// Concatenate the text blocks of a messages body.
pub(crate) fn parse_envelope(provider: &str, raw: Value) -> Result<Completion, CallError> {
  let blocks = raw
    .get("content")
    .and_then(Value::as_array)
    .ok_or_else(|| CallError::new(provider, "malformed response: no content array"))?;

  let text: String = blocks
    .iter()
    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
    .filter_map(|b| b.get("text").and_then(Value::as_str))
    .collect();
  if text.is_empty() {
    return Err(CallError::new(provider, "malformed response: no text block"));
  }

  let usage = raw.get("usage");
  Ok(Completion {
    text,
    model: raw.get("model").and_then(Value::as_str).map(str::to_owned),
    prompt_tokens: usage_count(usage, "input_tokens"),
    completion_tokens: usage_count(usage, "output_tokens"),
    cost_cents: None,
    raw,
  })
}
