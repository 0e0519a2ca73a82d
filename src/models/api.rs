use std::collections::HashMap;

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::matching::MatchResult;

/// Request to match a single wine list line.
#[derive(Debug, Deserialize, Validate)]
pub struct MatchRequest {
    #[garde(length(min = 1, max = 500))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub text: String,
    pub result: Option<MatchResult>,
}

/// Request to match every line scraped from a wine list page (at most 200).
#[derive(Debug, Deserialize, Validate)]
pub struct BatchMatchRequest {
    #[garde(length(min = 1, max = 200), inner(length(min = 1, max = 500)))]
    pub texts: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchMatchResponse {
    pub results: HashMap<String, Option<MatchResult>>,
}

/// Response after forwarding catalog writes to the search index.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogWriteResponse {
    pub accepted: usize,
}
