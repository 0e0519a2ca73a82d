use std::time::Duration;

use serde::Deserialize;

use crate::services::resolver::{MatchThresholds, ThresholdError};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Unused by the indexer.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the hosted search engine
    pub search_url: String,

    /// Search engine API key
    pub search_api_key: String,

    /// Index uid holding catalog wines
    #[serde(default = "default_search_index")]
    pub search_index: String,

    /// Local candidate cache file
    #[serde(default = "default_cache_path")]
    pub cache_path: String,

    /// Minimum confidence to accept a single-line fuzzy or remote match
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Minimum confidence to accept a remote hit from a batch lookup
    #[serde(default = "default_partial_match_threshold")]
    pub partial_match_threshold: f64,

    /// Timeout for each remote search call, in milliseconds
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_search_index() -> String {
    "wines".to_string()
}

fn default_cache_path() -> String {
    "data/wine_cache.json".to_string()
}

fn default_match_threshold() -> f64 {
    0.7
}

fn default_partial_match_threshold() -> f64 {
    0.6
}

fn default_remote_timeout_ms() -> u64 {
    5000
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn thresholds(&self) -> Result<MatchThresholds, ThresholdError> {
        MatchThresholds::new(self.match_threshold, self.partial_match_threshold)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}
