//! Layered configuration: optional TOML file, then `LOCUS__*` environment
//! variables (`LOCUS__LLM__API_KEY`, `LOCUS__ENRICHMENT__TTL_DAYS`, ...).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File};
use locus_enrich::EnrichmentSettings;
use locus_llm::LlmSettings;
use locus_metrics::MetricsSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub llm:        LlmSettings,
  pub enrichment: EnrichmentSettings,
  pub metrics:    MetricsSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("locus.db"),
      llm:        LlmSettings::default(),
      enrichment: EnrichmentSettings::default(),
      metrics:    MetricsSettings::default(),
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then apply environment overrides.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(
        Environment::with_prefix("LOCUS")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config from {}", path.display()))?;

    raw
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
