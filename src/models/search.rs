use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::wine::{Wine, WineColor};

/// Structured predicates applied by the search engine alongside the text query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilters {
    pub color: Option<WineColor>,
    pub country: Option<String>,
    pub min_score: Option<u8>,
    pub vintage: Option<i32>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.country.is_none() && self.min_score.is_none() && self.vintage.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub filters: SearchFilters,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            filters: SearchFilters::default(),
        }
    }
}

/// Match classification reported by the remote search service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RemoteMatchKind {
    Exact,
    Fuzzy,
    Semantic,
}

/// One ranked hit from the remote search service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub wine: Wine,
    pub confidence: f64,
    pub kind: RemoteMatchKind,
}
