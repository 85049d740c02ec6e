//! Deterministic prompt text for one business snapshot.

use std::str::FromStr;

use serde::Deserialize;

use crate::{Error, snapshot::Snapshot};

/// Metres per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Which fields the provider is allowed to fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptVariant {
  /// Every schema field, scores included.
  Full,
  /// Verifiable facts only; derived scores stay null for the metrics engine.
  #[default]
  DataQuality,
}

impl FromStr for PromptVariant {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "full" => Ok(Self::Full),
      "data-quality" => Ok(Self::DataQuality),
      other => Err(Error::Configuration(format!("unknown prompt variant {other:?}"))),
    }
  }
}

/// `(south, west, north, east)` around a point, `radius_m` in every direction.
pub fn bounding_box(lat: f64, lon: f64, radius_m: f64) -> (f64, f64, f64, f64) {
  let dlat = radius_m / METERS_PER_DEGREE;
  // Clamp near the poles where the longitude scale collapses.
  let cos_lat = lat.to_radians().cos().abs().max(1e-6);
  let dlon = radius_m / (METERS_PER_DEGREE * cos_lat);
  (lat - dlat, lon - dlon, lat + dlat, lon + dlon)
}

const FULL_SCHEMA_EXAMPLE: &str = r#"{
  "size_class": "small",
  "is_chain": false,
  "website_url": "https://www.example.com",
  "social": {
    "instagram": "https://www.instagram.com/example",
    "facebook": "https://www.facebook.com/example"
  },
  "marketing_attitude": 0.7,
  "umbrella_affinity": 0.9,
  "ad_budget_band": "medium",
  "confidence": 0.72,
  "provenance": {
    "reasoning": "Independent venue with strong tourist footfall."
  },
  "notes": null
}"#;

const DATA_QUALITY_SCHEMA_EXAMPLE: &str = r#"{
  "size_class": null,
  "is_chain": null,
  "website_url": "https://www.example.com",
  "social": {
    "instagram": "https://www.instagram.com/example"
  },
  "marketing_attitude": null,
  "umbrella_affinity": null,
  "ad_budget_band": null,
  "confidence": null,
  "provenance": {
    "sources": ["https://www.example.com/contacts"]
  },
  "notes": "Website lists the same street address."
}"#;

fn schema_example(variant: PromptVariant) -> &'static str {
  match variant {
    PromptVariant::Full => FULL_SCHEMA_EXAMPLE,
    PromptVariant::DataQuality => DATA_QUALITY_SCHEMA_EXAMPLE,
  }
}

/// Optional hint lines, in a fixed order.
fn details(s: &Snapshot) -> Vec<String> {
  let mut out = Vec::new();

  if let Some(formatted) = &s.formatted_address {
    if s.address.as_ref() != Some(formatted) {
      out.push(format!("- Formatted address in the dataset: {formatted}"));
    }
  }

  match (&s.external_category, &s.external_subtype) {
    (Some(cat), Some(sub)) if cat != sub => out.push(format!("- Map taxonomy: {cat} -> {sub}")),
    (Some(cat), _) => out.push(format!("- Map taxonomy: {cat}")),
    (None, Some(sub)) => out.push(format!("- Map taxonomy: {sub}")),
    (None, None) => {}
  }

  let types: Vec<&str> = s.types.iter().map(String::as_str).filter(|t| !t.is_empty()).collect();
  if !types.is_empty() {
    out.push(format!("- Category tags: {}", types.join(", ")));
  }

  if s.has_website {
    out.push("- The dataset reports an active website.".into());
  }
  if s.has_phone {
    out.push("- The dataset reports a phone number.".into());
  }

  let tag = |key: &str| s.tags.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
  if let Some(postcode) = tag("addr:postcode") {
    out.push(format!("- Declared postcode: {postcode}"));
  }
  if let Some(province) = tag("addr:province").or_else(|| tag("addr:state")) {
    out.push(format!("- Declared province: {province}"));
  }
  if let Some(region) = tag("addr:region") {
    out.push(format!("- Declared region: {region}"));
  }
  if let Some(cuisine) = tag("cuisine") {
    out.push(format!("- Declared cuisine: {cuisine}"));
  }
  if let Some(brand) = tag("brand") {
    out.push(format!("- Associated brand: {brand}"));
  }

  if let Some(minutes) = s.weekly_minutes.filter(|m| *m > 0) {
    out.push(format!("- Declared weekly opening time: {minutes} minutes"));
  }

  out
}

/// Render the user prompt for `snapshot`.
pub fn build_prompt(snapshot: &Snapshot, variant: PromptVariant) -> String {
  let name = snapshot.name.as_deref().unwrap_or("Unknown business");
  let category = snapshot.category.as_deref().unwrap_or("generic business");
  let address = snapshot.address.as_deref().unwrap_or("");
  let city = snapshot.city.as_deref().unwrap_or("");

  let mut lines: Vec<String> = vec![
    "You are a local marketing analyst for neighbourhood businesses.".into(),
    "Fill in *only* the fields of the data schema for the business below.".into(),
    String::new(),
    "Business:".into(),
    format!("- Name: {name}"),
    format!("- Category: {category}"),
    format!("- Address: {address}"),
    format!("- City: {city}"),
  ];

  if let (Some(lat), Some(lon)) = (snapshot.latitude, snapshot.longitude) {
    let radius = f64::from(snapshot.search_radius_m);
    let (south, west, north, east) = bounding_box(lat, lon, radius);
    lines.push(format!("- Coordinates (WGS84): lat {lat:.5}, lon {lon:.5}"));
    lines.push(format!("- Search radius: {} m", snapshot.search_radius_m));
    lines.push(format!(
      "- Bounding box: south {south:.5}, west {west:.5}, north {north:.5}, east {east:.5}"
    ));
  }

  let extra = details(snapshot);
  if !extra.is_empty() {
    lines.push(String::new());
    lines.push("Additional details:".into());
    lines.extend(extra);
  }

  lines.extend(
    [
      "",
      "Rules:",
      "- Output exactly one valid JSON object, with no text before or after it.",
      "- If you are not sure about a value, set it to null and lower \"confidence\".",
      "- Only report information you can tie to this exact business inside the bounding box.",
      "- \"website_url\" and \"social\" values must be absolute URLs.",
      "- \"social\": map of platform -> URL, only when plausible.",
      "- \"provenance\": a short justification or the sources used.",
    ]
    .map(String::from),
  );

  let variant_rules: &[&str] = match variant {
    PromptVariant::Full => &[
      "- \"size_class\": one of micro, small, medium, large.",
      "- \"is_chain\": true when the business belongs to a chain or franchise.",
      "- \"umbrella_affinity\": score 0..1 for how well a branded umbrella fits the clientele.",
      "- \"marketing_attitude\": score 0..1 for how actively the business markets itself.",
      "- \"ad_budget_band\": cautious estimate (low, medium, high) from category and size.",
    ],
    PromptVariant::DataQuality => &[
      "- Leave \"size_class\", \"is_chain\", \"marketing_attitude\", \"umbrella_affinity\", \
       \"ad_budget_band\" and \"confidence\" null; they are computed downstream.",
      "- Focus on verifiable facts: website, social profiles, notes.",
    ],
  };
  lines.extend(variant_rules.iter().map(|rule| (*rule).to_owned()));

  lines.push(String::new());
  lines.push("Schema example:".into());

  let mut prompt = lines.join("\n");
  prompt.push('\n');
  prompt.push_str(schema_example(variant));
  prompt
}
