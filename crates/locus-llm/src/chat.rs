//! Chat-completions adapter, shared by OpenAI and Perplexity.

use locus_core::completion::{Completion, CompletionClient, CompletionRequest};
use reqwest::{
  Client,
  header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::Serialize;
use serde_json::Value;

use crate::{
  clamp_temperature,
  error::CallError,
  http::{send_json, usage_count},
  settings::{DEFAULT_SYSTEM_PROMPT, ProviderKind},
};

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatMessage<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Serialize)]
struct ChatBody<'a> {
  model:       &'a str,
  messages:    [ChatMessage<'a>; 2],
  temperature: f32,
  max_tokens:  u32,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Client for any `/chat/completions` endpoint with bearer auth.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
  provider:      &'static str,
  http:          Client,
  api_key:       String,
  model:         String,
  endpoint:      String,
  system_prompt: String,
}

impl ChatCompletionsClient {
  /// A client with `kind`'s default model and endpoint.
  pub fn new(kind: ProviderKind, api_key: impl Into<String>, http: Client) -> Self {
    Self {
      provider: kind.as_str(),
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

impl CompletionClient for ChatCompletionsClient {
  type Error = CallError;

  fn provider(&self) -> &str { self.provider }

  async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CallError> {
    let body = ChatBody {
      model:       &self.model,
      messages:    [
        ChatMessage { role: "system", content: &self.system_prompt },
        ChatMessage { role: "user", content: &request.prompt },
      ],
      temperature: clamp_temperature(request.temperature),
      max_tokens:  request.max_tokens,
    };

    tracing::debug!(
      provider = self.provider,
      model = %self.model,
      endpoint = %self.endpoint,
      "chat completion request"
    );

    let req = self
      .http
      .post(&self.endpoint)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .header(CONTENT_TYPE, "application/json")
      .json(&body);

    let envelope = send_json(self.provider, req).await?;
    parse_envelope(self.provider, envelope)
  }
}

/// Pull the assistant text and accounting out of a chat-completions body.
pub(crate) fn parse_envelope(provider: &str, raw: Value) -> Result<Completion, CallError> {
  let text = raw
    .pointer("/choices/0/message/content")
    .and_then(Value::as_str)
    .ok_or_else(|| CallError::new(provider, "malformed response: no choices[0].message.content"))?
    .to_owned();

  let usage = raw.get("usage");
  Ok(Completion {
    text,
    model: raw.get("model").and_then(Value::as_str).map(str::to_owned),
    prompt_tokens: usage_count(usage, "prompt_tokens"),
    completion_tokens: usage_count(usage, "completion_tokens"),
    cost_cents: None,
    raw,
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn parses_openai_envelope() {
    let raw = json!({
      "model": "gpt-4o-mini-2024-07-18",
      "choices": [{ "message": { "role": "assistant", "content": "{\"notes\":null}" } }],
      "usage": { "prompt_tokens": 210, "completion_tokens": 35 }
    });
    let c = parse_envelope("openai", raw.clone()).unwrap();
    assert_eq!(c.text, "{\"notes\":null}");
    assert_eq!(c.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    assert_eq!(c.prompt_tokens, Some(210));
    assert_eq!(c.completion_tokens, Some(35));
    assert_eq!(c.cost_cents, None);
    assert_eq!(c.raw, raw);
  }

  #[test]
  fn usage_is_optional() {
    let raw = json!({ "choices": [{ "message": { "content": "{}" } }] });
    let c = parse_envelope("perplexity", raw).unwrap();
    assert!(c.model.is_none());
    assert!(c.prompt_tokens.is_none());
  }

  #[test]
  fn missing_choices_is_a_call_error() {
    let err = parse_envelope("openai", json!({ "choices": [] })).unwrap_err();
    assert_eq!(err.provider, "openai");
    assert!(err.message.contains("malformed"));
  }

  #[test]
  fn body_serialises_with_system_prompt_first() {
    let body = ChatBody {
      model:       "sonar",
      messages:    [
        ChatMessage { role: "system", content: "sys" },
        ChatMessage { role: "user", content: "hello" },
      ],
      temperature: 0.2,
      max_tokens:  600,
    };
    let v = serde_json::to_value(&body).unwrap();
    assert_eq!(v["messages"][0]["role"], "system");
    assert_eq!(v["messages"][1]["content"], "hello");
    assert_eq!(v["max_tokens"], 600);
  }
}
