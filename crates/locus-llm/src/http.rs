//! The one HTTP round-trip every adapter shares.

use reqwest::RequestBuilder;
use serde_json::Value;

use crate::error::CallError;

/// Longest slice of an error body quoted back in a [`CallError`].
const BODY_SNIPPET_CHARS: usize = 300;

/// Send `request` and decode a successful body as JSON. Anything else is a
/// [`CallError`] for `provider`.
pub(crate) async fn send_json(provider: &str, request: RequestBuilder) -> Result<Value, CallError> {
  let resp = request
    .send()
    .await
    .map_err(|e| CallError::new(provider, format!("request failed: {e}")))?;

  let status = resp.status();
  let body = resp
    .text()
    .await
    .map_err(|e| CallError::new(provider, format!("reading body failed: {e}")))?;

  if !status.is_success() {
    let snippet: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
    return Err(CallError::new(provider, format!("API error {status}: {snippet}")));
  }

  serde_json::from_str(&body)
    .map_err(|e| CallError::new(provider, format!("response is not JSON: {e}")))
}

/// Read an optional token counter from a usage object.
pub(crate) fn usage_count(usage: Option<&Value>, key: &str) -> Option<u32> {
  usage
    .and_then(|u| u.get(key))
    .and_then(Value::as_u64)
    .and_then(|n| u32::try_from(n).ok())
}
