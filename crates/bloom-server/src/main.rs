//! bloom server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and then either serves the HTTP API, imports a CSV export, or runs
//! site clustering.

use std::{
  fs::File,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use bloom_core::cluster::run_clustering;
use bloom_llm::OpenAiClient;
use bloom_server::Settings;
use bloom_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Bloom phenology server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,
  /// Import a phenology CSV export into the store.
  Import {
    /// The CSV file to read.
    csv: PathBuf,
  },
  /// Build one area per site from the plants in the store.
  ///
  /// Rerunning moves plants into fresh areas and deletes the areas it
  /// leaves empty.
  Cluster,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {:?}", cli.config))?;

  let store_path = expand_tilde(&settings.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Serve => serve(store, &settings).await,
    Command::Import { csv } => {
      let file = File::open(&csv).with_context(|| format!("failed to open {csv:?}"))?;
      let report = bloom_ingest::import(&store, file, &settings.ingest)
        .await
        .with_context(|| format!("failed to import {csv:?}"))?;
      println!("{}", serde_json::to_string_pretty(&report)?);
      Ok(())
    }
    Command::Cluster => {
      let report = run_clustering(&store, &settings.cluster)
        .await
        .context("failed to load sites and plants")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, settings: &Settings) -> anyhow::Result<()> {
  if settings.llm.api_key.is_none() {
    tracing::warn!("no llm.api_key configured; assistant endpoints will fail");
  }
  let assistant =
    OpenAiClient::new(settings.llm.clone()).context("failed to build HTTP client")?;

  let app = bloom_server::app(Arc::new(store), Arc::new(assistant));
  let address = settings.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
