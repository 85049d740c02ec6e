//! Allow-listed validation of provider output into [`ExtractedFacts`].
//!
//! Provider text is untrusted. Only the known schema fields are read; unknown
//! fields are ignored. Any violation rejects the whole response.

use std::{collections::BTreeMap, sync::LazyLock};

use locus_core::facts::{BudgetBand, ExtractedFacts, SizeClass};
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::error::ValidationError;

static FENCE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.+?)\s*```$").expect("static regex"));

/// Remove one surrounding Markdown code fence, if present.
fn strip_fence(text: &str) -> &str {
  let trimmed = text.trim();
  FENCE_RE
    .captures(trimmed)
    .and_then(|c| c.get(1))
    .map_or(trimmed, |m| m.as_str())
}

fn kind_of(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
  ValidationError::InvalidField { field: field.to_owned(), reason: reason.into() }
}

/// Trim, add `https://` when no scheme is given, and require an absolute
/// http(s) URL with a host. Blank input is `None`.
pub fn normalize_url(raw: &str) -> Result<Option<String>, String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }
  let lower = trimmed.to_ascii_lowercase();
  let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
    trimmed.to_owned()
  } else if lower.contains("://") {
    return Err(format!("{trimmed:?} is not an http(s) URL"));
  } else {
    format!("https://{trimmed}")
  };

  let url = Url::parse(&candidate).map_err(|e| format!("{trimmed:?} is not a URL: {e}"))?;
  if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
    return Err(format!("{trimmed:?} is not an http(s) URL"));
  }
  Ok(Some(url.into()))
}

// ─── Field readers ───────────────────────────────────────────────────────────

/// `None` for an absent or null field.
fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
  obj.get(name).filter(|v| !v.is_null())
}

fn read_str<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<Option<&'a str>, ValidationError> {
  match field(obj, name) {
    None => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.as_str())),
    Some(other) => Err(invalid(name, format!("expected string, got {}", kind_of(other)))),
  }
}

fn read_bool(obj: &Map<String, Value>, name: &str) -> Result<Option<bool>, ValidationError> {
  match field(obj, name) {
    None => Ok(None),
    Some(Value::Bool(b)) => Ok(Some(*b)),
    Some(other) => Err(invalid(name, format!("expected boolean, got {}", kind_of(other)))),
  }
}

fn read_unit(obj: &Map<String, Value>, name: &str) -> Result<Option<f64>, ValidationError> {
  match field(obj, name) {
    None => Ok(None),
    Some(v) => {
      let n = v
        .as_f64()
        .ok_or_else(|| invalid(name, format!("expected number, got {}", kind_of(v))))?;
      if !(0.0..=1.0).contains(&n) {
        return Err(invalid(name, format!("{n} is outside [0, 1]")));
      }
      Ok(Some(n))
    }
  }
}

fn read_url(obj: &Map<String, Value>, name: &str) -> Result<Option<String>, ValidationError> {
  match read_str(obj, name)? {
    None => Ok(None),
    Some(raw) => normalize_url(raw).map_err(|reason| invalid(name, reason)),
  }
}

fn read_social(obj: &Map<String, Value>) -> Result<BTreeMap<String, String>, ValidationError> {
  let entries = match field(obj, "social") {
    None => return Ok(BTreeMap::new()),
    Some(Value::Object(map)) => map,
    Some(other) => return Err(invalid("social", format!("expected object, got {}", kind_of(other)))),
  };

  let mut social = BTreeMap::new();
  for (platform, value) in entries {
    let label = format!("social.{platform}");
    let raw = match value {
      Value::Null => continue,
      Value::String(s) => s,
      other => return Err(invalid(&label, format!("expected string, got {}", kind_of(other)))),
    };
    if let Some(url) = normalize_url(raw).map_err(|reason| invalid(&label, reason))? {
      social.insert(platform.clone(), url);
    }
  }
  Ok(social)
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Parse and validate one provider response.
pub fn parse_facts(text: &str) -> Result<ExtractedFacts, ValidationError> {
  let value: Value = serde_json::from_str(strip_fence(text))?;
  let obj = match value {
    Value::Object(obj) => obj,
    other => return Err(ValidationError::NotAnObject(kind_of(&other))),
  };

  let size_class = read_str(&obj, "size_class")?
    .map(|s| s.parse::<SizeClass>().map_err(|e| invalid("size_class", e.to_string())))
    .transpose()?;
  let ad_budget_band = read_str(&obj, "ad_budget_band")?
    .map(|s| s.parse::<BudgetBand>().map_err(|e| invalid("ad_budget_band", e.to_string())))
    .transpose()?;

  let provenance = match field(&obj, "provenance") {
    None => None,
    Some(v @ Value::Object(_)) => Some(v.clone()),
    Some(other) => {
      return Err(invalid("provenance", format!("expected object, got {}", kind_of(other))));
    }
  };

  Ok(ExtractedFacts {
    size_class,
    is_chain: read_bool(&obj, "is_chain")?,
    website_url: read_url(&obj, "website_url")?,
    social: read_social(&obj)?,
    marketing_attitude: read_unit(&obj, "marketing_attitude")?,
    umbrella_affinity: read_unit(&obj, "umbrella_affinity")?,
    ad_budget_band,
    confidence: read_unit(&obj, "confidence")?,
    provenance,
    notes: read_str(&obj, "notes")?.map(str::to_owned),
  })
}
