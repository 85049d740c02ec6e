//! Address and city resolution for a business snapshot.
//!
//! Upstream rows are often incomplete: the clean address may be missing, the
//! city may only appear in map tags or buried in a provider-formatted address.
//! Every resolved value has its whitespace collapsed; blanks count as absent.

use std::sync::LazyLock;

use locus_core::business::BusinessEntity;
use regex::Regex;

static POSTCODE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b\d{4,5}\b").expect("static regex"));
static PROVINCE_CODE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b[A-Z]{2}\b$").expect("static regex"));

const CITY_TAGS: [&str; 6] = [
  "addr:city",
  "addr:town",
  "addr:village",
  "addr:hamlet",
  "addr:municipality",
  "addr:suburb",
];

const REGION_KEYWORDS: &[&str] = &[
  "abruzzo",
  "basilicata",
  "calabria",
  "campania",
  "emilia-romagna",
  "friuli-venezia giulia",
  "lazio",
  "liguria",
  "lombardia",
  "marche",
  "molise",
  "piemonte",
  "puglia",
  "sardegna",
  "sicilia",
  "toscana",
  "trentino-alto adige",
  "umbria",
  "valle d'aosta",
  "valle d aosta",
  "veneto",
  "provincia autonoma di bolzano",
  "provincia autonoma di trento",
];

const COUNTRY_KEYWORDS: &[&str] = &["italia", "italy", "repubblica italiana", "europe", "ue"];

/// Collapse runs of whitespace; `None` when nothing is left.
pub fn collapse(value: Option<&str>) -> Option<String> {
  let joined = value?.split_whitespace().collect::<Vec<_>>().join(" ");
  (!joined.is_empty()).then_some(joined)
}

fn is_region_or_country(part: &str) -> bool {
  let lower = part.to_lowercase();
  REGION_KEYWORDS.contains(&lower.as_str()) || COUNTRY_KEYWORDS.contains(&lower.as_str())
}

/// First non-blank tag among `keys`.
fn first_tag(business: &BusinessEntity, keys: &[&str]) -> Option<String> {
  keys.iter().find_map(|k| collapse(business.tag(k)))
}

/// Strip postcodes, a trailing province code and stray digits from one
/// comma-separated address component.
fn city_candidate(part: &str) -> Option<String> {
  let without_postcode = POSTCODE_RE.replace_all(part, "");
  let without_province = PROVINCE_CODE_RE.replace(&without_postcode, "");
  let trimmed = without_province.trim_matches(|c: char| " ,;/\\-".contains(c));
  let cleaned = collapse(Some(trimmed))?;
  if is_region_or_country(&cleaned) {
    return None;
  }

  let cleaned = if cleaned.chars().any(|c| c.is_ascii_digit()) {
    let digitless: String = cleaned.chars().filter(|c| !c.is_ascii_digit()).collect();
    collapse(Some(digitless.as_str()))?
  } else {
    cleaned
  };
  Some(cleaned)
}

/// Explicit city, else a city-like tag, else the last plausible component of
/// the formatted address.
pub fn resolve_city(business: &BusinessEntity) -> Option<String> {
  if let Some(city) = collapse(business.city.as_deref()) {
    return Some(city);
  }
  if let Some(city) = first_tag(business, &CITY_TAGS) {
    return Some(city);
  }

  let formatted = business.formatted_address.as_deref()?;
  formatted
    .split(',')
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .rev()
    .filter(|p| !is_region_or_country(p))
    .find_map(city_candidate)
}

/// Explicit address, else the formatted address, else one assembled from
/// `addr:*` tags as `street number, locality, postcode`.
pub fn resolve_address(business: &BusinessEntity, fallback_city: Option<&str>) -> Option<String> {
  if let Some(address) = collapse(business.address.as_deref()) {
    return Some(address);
  }
  if let Some(formatted) = collapse(business.formatted_address.as_deref()) {
    return Some(formatted);
  }

  let street = first_tag(business, &["addr:street", "addr:road", "addr:place"]);
  let number = first_tag(business, &["addr:housenumber", "addr:number"]);
  let locality = first_tag(business, &["addr:city", "addr:town", "addr:village", "addr:hamlet"])
    .or_else(|| collapse(fallback_city));
  let postcode = first_tag(business, &["addr:postcode"]);

  let street_line = match (street, number) {
    (Some(s), Some(n)) => Some(format!("{s} {n}")),
    (s, n) => s.or(n),
  };

  let mut parts: Vec<String> = Vec::new();
  for part in [street_line, locality, postcode].into_iter().flatten() {
    if !parts.contains(&part) {
      parts.push(part);
    }
  }
  (!parts.is_empty()).then(|| parts.join(", "))
}
