//! Heuristic fallbacks for business facts.
//!
//! Each field resolves independently: an authoritative stored fact always wins,
//! and only missing fields are derived from category, tags and flags.

use std::collections::BTreeMap;

use locus_core::{
  business::BusinessEntity,
  facts::{BudgetBand, BusinessFacts, SizeClass},
};

/// Affinity by category substring. Order matters: the first match wins.
pub const AFFINITY_RULES: &[(&str, f64)] = &[
  ("bar", 0.9),
  ("cafe", 0.85),
  ("coffee", 0.85),
  ("pub", 0.85),
  ("restaurant", 0.9),
  ("pizzeria", 0.9),
  ("gelateria", 0.9),
  ("ice_cream", 0.9),
  ("bakery", 0.8),
  ("takeaway", 0.85),
  ("fast_food", 0.8),
  ("clothes", 0.7),
  ("fashion", 0.7),
  ("beauty", 0.7),
  ("hairdresser", 0.6),
  ("gym", 0.75),
  ("fitness", 0.75),
  ("pharmacy", 0.6),
  ("optician", 0.6),
  ("supermarket", 0.7),
  ("convenience", 0.7),
  ("boutique", 0.6),
  ("professional", 0.4),
  ("lawyer", 0.3),
  ("notary", 0.3),
  ("mechanic", 0.2),
  ("car_repair", 0.2),
];

pub const DEFAULT_AFFINITY: f64 = 0.5;

/// Lowercase name fragments of well-known chains.
const CHAIN_KEYWORDS: &[&str] = &[
  "coop",
  "conad",
  "esselunga",
  "iper",
  "ipercoop",
  "md ",
  "lidl",
  "carrefour",
  "pam",
  "penny",
  "mcdonald",
  "kfc",
  "burger king",
  "subway",
  "decathlon",
  "ikea",
  "h&m",
  "ovs",
  "oviesse",
  "upim",
  "foot locker",
  "unicredit",
  "intesa sanpaolo",
  "poste italiane",
];

/// Map tag key → social platform.
const SOCIAL_TAG_KEYS: &[(&str, &str)] = &[
  ("contact:facebook", "facebook"),
  ("contact:instagram", "instagram"),
  ("contact:twitter", "twitter"),
  ("contact:linkedin", "linkedin"),
  ("facebook", "facebook"),
  ("instagram", "instagram"),
  ("twitter", "twitter"),
  ("linkedin", "linkedin"),
];

/// Tags that signal active outreach.
const CONTACT_TAGS: [&str; 4] = ["contact:email", "contact:website", "booking", "contact:whatsapp"];

const BRAND_TAGS: [&str; 3] = ["brand", "operator", "network"];

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

/// First non-blank value, lowercased with spaces and dashes as underscores.
pub fn normalize_category<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
  values.into_iter().flatten().find_map(|v| {
    let token = v.trim().to_lowercase().replace(['-', ' '], "_");
    (!token.is_empty()).then_some(token)
  })
}

fn category_token(b: &BusinessEntity) -> Option<String> {
  normalize_category([b.category.as_deref()])
}

// ─── Individual estimators ───────────────────────────────────────────────────

pub fn estimate_size_class(b: &BusinessEntity, chain_hint: Option<bool>) -> SizeClass {
  let token = normalize_category([
    b.category.as_deref(),
    b.external_subtype.as_deref(),
    b.external_category.as_deref(),
  ]);
  let Some(token) = token else {
    return SizeClass::Micro;
  };
  let t = token.as_str();

  if chain_hint == Some(true) {
    return match t {
      "supermarket" | "shopping_centre" | "department_store" => SizeClass::Large,
      _ => SizeClass::Medium,
    };
  }
  match t {
    "supermarket" | "hypermarket" | "shopping_centre" => SizeClass::Large,
    "gym" | "fitness_centre" | "car_dealer" => SizeClass::Medium,
    "restaurant" | "pizzeria" | "fast_food" | "pub" | "bar" | "cafe" => SizeClass::Small,
    "pharmacy" | "hairdresser" | "beauty_salon" | "optician" => SizeClass::Small,
    _ => SizeClass::Micro,
  }
}

pub fn infer_budget_band(size: Option<SizeClass>, b: &BusinessEntity) -> Option<BudgetBand> {
  let base = size.map(|s| match s {
    SizeClass::Micro => BudgetBand::Low,
    SizeClass::Small | SizeClass::Medium => BudgetBand::Medium,
    SizeClass::Large => BudgetBand::High,
  });

  match category_token(b).as_deref() {
    Some("lawyer" | "notary" | "accountant" | "dentist") => Some(if base == Some(BudgetBand::High) {
      BudgetBand::Medium
    } else {
      BudgetBand::Low
    }),
    Some("supermarket" | "shopping_centre") => Some(BudgetBand::High),
    Some("bar" | "cafe" | "pizzeria" | "gelateria" | "restaurant") if base.is_some() => {
      Some(BudgetBand::Medium)
    }
    _ => base,
  }
}

pub fn default_affinity(b: &BusinessEntity) -> f64 {
  let Some(token) = normalize_category([b.category.as_deref(), b.external_subtype.as_deref()])
  else {
    return DEFAULT_AFFINITY;
  };
  AFFINITY_RULES
    .iter()
    .find(|(key, _)| token.contains(key))
    .map_or(DEFAULT_AFFINITY, |(_, score)| *score)
}

/// A brand/operator/network tag, or a chain keyword in the name.
pub fn detect_brand(b: &BusinessEntity) -> bool {
  if BRAND_TAGS.iter().any(|k| b.tag(k).is_some()) {
    return true;
  }
  b.name.as_deref().is_some_and(|name| {
    let lower = name.to_lowercase();
    CHAIN_KEYWORDS.iter().any(|kw| lower.contains(kw))
  })
}

/// Social handles declared in map tags.
pub fn social_from_tags(b: &BusinessEntity) -> BTreeMap<String, String> {
  let mut social = BTreeMap::new();
  for (key, value) in &b.tags {
    let key = key.to_lowercase();
    let Some((_, platform)) = SOCIAL_TAG_KEYS.iter().find(|(k, _)| *k == key) else {
      continue;
    };
    let value = value.trim();
    if !value.is_empty() {
      social.insert((*platform).to_owned(), value.to_owned());
    }
  }
  social
}

pub fn estimate_is_chain(b: &BusinessEntity, size: Option<SizeClass>, hint: Option<bool>) -> bool {
  if let Some(hint) = hint {
    return hint;
  }
  if detect_brand(b) {
    return true;
  }
  let token = category_token(b);
  match token.as_deref() {
    Some("supermarket" | "hypermarket" | "shopping_centre") => true,
    Some("gym" | "fitness_centre" | "department_store") => {
      size.is_some_and(SizeClass::is_medium_or_large)
    }
    _ => false,
  }
}

pub fn estimate_marketing_attitude(
  b: &BusinessEntity,
  has_website: bool,
  social_count: usize,
  brand: bool,
) -> f64 {
  let mut score = 0.25;
  if has_website {
    score += 0.3;
  }
  if social_count > 0 {
    score += (0.12 * social_count as f64).min(0.25);
  }
  if CONTACT_TAGS.iter().any(|k| b.tag(k).is_some()) {
    score += 0.1;
  }
  if brand {
    score += 0.05;
  }
  if b.weekly_minutes.is_some_and(|m| m > 40 * 60) {
    score += 0.05;
  }
  round2(score).min(1.0)
}

pub fn estimate_confidence(
  b: &BusinessEntity,
  has_website: bool,
  social_count: usize,
  brand: bool,
  attitude: f64,
  size: Option<SizeClass>,
) -> f64 {
  let mut score = 0.35;
  if has_website {
    score += 0.2;
  }
  if b.has_phone {
    score += 0.1;
  }
  if social_count > 0 {
    score += 0.15;
  }
  if brand || size.is_some_and(SizeClass::is_medium_or_large) {
    score += 0.1;
  }
  score += 0.1 * attitude;
  round2(score).min(0.95)
}

// ─── Field-by-field resolution ───────────────────────────────────────────────

/// Every scoring field for one business, stored fact or heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFacts {
  pub size_class:         SizeClass,
  pub is_chain:           bool,
  pub ad_budget_band:     Option<BudgetBand>,
  pub umbrella_affinity:  f64,
  pub marketing_attitude: f64,
  pub confidence:         f64,
  /// Stored social channels, else tag-derived ones.
  pub social:             BTreeMap<String, String>,
}

pub fn resolve(b: &BusinessEntity, facts: Option<&BusinessFacts>) -> ResolvedFacts {
  let has_website = b.has_website || facts.is_some_and(|f| f.website_url.is_some());
  let brand = detect_brand(b);

  let social = match facts.map(|f| &f.social) {
    Some(stored) if !stored.is_empty() => stored.clone(),
    _ => social_from_tags(b),
  };

  let chain_hint = facts.and_then(|f| f.is_chain);
  let size_class = facts
    .and_then(|f| f.size_class)
    .unwrap_or_else(|| estimate_size_class(b, chain_hint));
  let is_chain = estimate_is_chain(b, Some(size_class), chain_hint);
  let ad_budget_band = facts
    .and_then(|f| f.ad_budget_band)
    .or_else(|| infer_budget_band(Some(size_class), b));
  let umbrella_affinity = facts
    .and_then(|f| f.umbrella_affinity)
    .unwrap_or_else(|| default_affinity(b));
  let marketing_attitude = facts
    .and_then(|f| f.marketing_attitude)
    .unwrap_or_else(|| estimate_marketing_attitude(b, has_website, social.len(), brand));
  let confidence = facts.and_then(|f| f.confidence).unwrap_or_else(|| {
    estimate_confidence(b, has_website, social.len(), brand, marketing_attitude, Some(size_class))
  });

  ResolvedFacts {
    size_class,
    is_chain,
    ad_budget_band,
    umbrella_affinity,
    marketing_attitude,
    confidence,
    social,
  }
}
