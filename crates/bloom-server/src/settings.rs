//! Runtime configuration.
//!
//! Read from an optional TOML file, then overridden by `BLOOM_*` environment
//! variables. Nested keys use a double underscore, e.g.
//! `BLOOM_LLM__API_KEY` or `BLOOM_CLUSTER__MAX_POINTS`.

use std::path::{Path, PathBuf};

use bloom_core::cluster::ClusterOptions;
use bloom_ingest::IngestOptions;
use bloom_llm::OpenAiConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub cluster:    ClusterOptions,
  pub ingest:     IngestOptions,
  pub llm:        OpenAiConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      host:       "0.0.0.0".into(),
      port:       8000,
      store_path: "bloom.sqlite3".into(),
      cluster:    ClusterOptions::default(),
      ingest:     IngestOptions::default(),
      llm:        OpenAiConfig::default(),
    }
  }
}

impl Settings {
  /// Load `path` (if it exists) layered under the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(
        Environment::with_prefix("BLOOM")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  /// Parse a TOML document without consulting the environment.
  pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
