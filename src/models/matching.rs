use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::wine::Wine;

/// How a match was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchKind {
    Exact,
    FuzzyLocal,
    FuzzyRemote,
}

/// A wine list line reduced to its matchable parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedQuery {
    pub raw: String,
    /// Normalized text with the price fragment removed.
    pub normalized: String,
    pub vintage: Option<i32>,
    pub price: Option<f64>,
}

/// Accepted match for a wine list line. Only ever produced above threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub wine: Wine,
    pub confidence: f64,
    /// Vintage read from the line, else the catalog entry's vintage.
    pub vintage: Option<i32>,
    pub kind: MatchKind,
    /// Price printed on the wine list, when one was found.
    pub list_price: Option<f64>,
}

impl MatchResult {
    pub fn new(wine: Wine, confidence: f64, kind: MatchKind, parsed: &ParsedQuery) -> Self {
        let vintage = parsed.vintage.or(wine.vintage);
        Self {
            wine,
            confidence,
            vintage,
            kind,
            list_price: parsed.price,
        }
    }
}
