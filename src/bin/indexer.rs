//! Index setup and bulk load.
//!
//! Applies index settings (synonyms, filterable attributes, ranking) once,
//! then indexes a JSON array of catalog wines in chunks.
//!
//! Usage: `indexer [catalog.json]`. Without a path only the settings are applied.

use garde::Validate;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use winelist_match::{
    config::AppConfig,
    models::wine::Wine,
    services::search::{RemoteSearch, SearchClient},
};

const CHUNK_SIZE: usize = 500;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    let client = SearchClient::new(
        &config.search_url,
        &config.search_api_key,
        &config.search_index,
        config.remote_timeout(),
    )
    .expect("Failed to initialize search client");

    tracing::info!(index = %config.search_index, "Applying search index settings");
    if let Err(e) = client.configure_index().await {
        tracing::error!(error = %e, "Failed to apply index settings");
        std::process::exit(1);
    }

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        tracing::info!("No catalog file given, settings applied only");
        return;
    };

    if let Err(e) = load_catalog(&client, &path).await {
        tracing::error!(path = %path.display(), error = %e, "Catalog load failed");
        std::process::exit(1);
    }
}

/// Index every valid wine in the file. Invalid records are skipped and logged.
async fn load_catalog(client: &SearchClient, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path).await?;
    let wines: Vec<Wine> = serde_json::from_slice(&bytes)?;
    let total = wines.len();

    let valid: Vec<Wine> = wines
        .into_iter()
        .filter(|wine| match wine.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(wine_id = %wine.id, error = %e, "Skipping invalid catalog wine");
                false
            }
        })
        .collect();

    tracing::info!(total, valid = valid.len(), "Indexing catalog wines");

    for (n, chunk) in valid.chunks(CHUNK_SIZE).enumerate() {
        client.index_entries(chunk).await?;
        tracing::info!(chunk = n + 1, size = chunk.len(), "Indexed catalog chunk");
    }

    Ok(())
}
