//! Remote catalog search service client.
//!
//! Talks to a Meilisearch-compatible engine. The engine ranks hits with its
//! own typo-tolerant relevance rules (review score as the tie-break); the
//! confidence attached to each hit is computed here, independently of rank,
//! so it stays comparable with local match scores.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::search::{RemoteMatchKind, SearchFilters, SearchHit, SearchOptions};
use crate::models::wine::Wine;
use crate::services::normalizer::{normalize, tokenize};

const OVERLAP_WEIGHT: f64 = 0.8;
const VINTAGE_BOOST: f64 = 0.15;
const BASELINE: f64 = 0.05;
const MAX_CONFIDENCE: f64 = 0.99;

/// Domain synonym groups applied by the engine at query time.
pub const SYNONYM_GROUPS: &[&[&str]] = &[
    &["cab", "cabernet", "cabernet sauvignon"],
    &["sauv blanc", "sauvignon blanc"],
    &["pinot", "pinot noir"],
    &["chard", "chardonnay"],
    &["zin", "zinfandel"],
    &["gsm", "grenache syrah mourvedre"],
    &["chateau", "chteau", "ch"],
    &["domaine", "dom", "domain"],
    &["shiraz", "syrah"],
    &["champagne", "champ"],
];

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("HTTP request to search service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse search service response: {0}")]
    Parse(String),

    #[error("Search service unavailable: {0}")]
    Unavailable(String),

    #[error("Search service did not respond in time")]
    Timeout,
}

/// Contract of the hosted catalog index.
#[async_trait]
pub trait RemoteSearch: Send + Sync {
    /// Ranked hits for one query.
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>, SearchError>;

    /// Top hit per query, issued as a single request. Output is aligned with input.
    async fn batch_search(&self, queries: &[String]) -> Result<Vec<Option<SearchHit>>, SearchError>;

    async fn index_entry(&self, wine: &Wine) -> Result<(), SearchError> {
        self.index_entries(std::slice::from_ref(wine)).await
    }

    async fn index_entries(&self, wines: &[Wine]) -> Result<(), SearchError>;

    async fn delete_entry(&self, id: Uuid) -> Result<(), SearchError>;

    /// Cheap reachability probe for health checks.
    async fn health_check(&self) -> Result<(), SearchError>;
}

/// Document shape stored in the search index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WineDocument {
    #[serde(flatten)]
    pub wine: Wine,
    pub full_name: String,
    pub searchable_text: String,
    pub normalized_producer: String,
    pub normalized_name: String,
}

impl From<&Wine> for WineDocument {
    fn from(wine: &Wine) -> Self {
        let full_name = wine.full_name();
        let searchable_text = normalize(&[
            full_name.as_str(),
            wine.region.as_deref().unwrap_or_default(),
            wine.appellation.as_deref().unwrap_or_default(),
            wine.country.as_deref().unwrap_or_default(),
        ]
        .join(" "));

        Self {
            wine: wine.clone(),
            full_name,
            searchable_text,
            normalized_producer: normalize(&wine.producer),
            normalized_name: normalize(&wine.name),
        }
    }
}

/// Confidence for a hit: 0.8 x query token overlap, +0.15 when the query
/// contains the hit's vintage, +0.05 baseline, capped at 0.99.
pub fn hit_confidence(query: &str, searchable_text: &str, vintage: Option<i32>) -> f64 {
    let query = normalize(query);
    let overlap = token_overlap(&query, searchable_text);
    let vintage_boost = match vintage {
        Some(v) if query.contains(&v.to_string()) => VINTAGE_BOOST,
        _ => 0.0,
    };
    (OVERLAP_WEIGHT * overlap + vintage_boost + BASELINE).min(MAX_CONFIDENCE)
}

/// Fraction of query tokens present in the hit text.
fn token_overlap(query: &str, searchable_text: &str) -> f64 {
    let query_tokens: HashSet<&str> = tokenize(query).collect();
    if query_tokens.is_empty() {
        return 0.0;
    }
    let hit_tokens: HashSet<&str> = tokenize(searchable_text).collect();
    query_tokens.intersection(&hit_tokens).count() as f64 / query_tokens.len() as f64
}

fn classify_hit(query: &str, searchable_text: &str) -> RemoteMatchKind {
    let query_tokens: HashSet<&str> = tokenize(query).collect();
    let hit_tokens: HashSet<&str> = tokenize(searchable_text).collect();
    if !query_tokens.is_empty() && query_tokens == hit_tokens {
        RemoteMatchKind::Exact
    } else {
        RemoteMatchKind::Fuzzy
    }
}

/// Render structured filters in the engine's filter expression syntax.
pub fn filter_expression(filters: &SearchFilters) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(color) = filters.color {
        clauses.push(format!("color = {}", quote(&color.to_string())));
    }
    if let Some(country) = &filters.country {
        clauses.push(format!("country = {}", quote(country)));
    }
    if let Some(min_score) = filters.min_score {
        clauses.push(format!("score >= {}", min_score));
    }
    if let Some(vintage) = filters.vintage {
        clauses.push(format!("vintage = {}", vintage));
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<WineDocument>,
}

#[derive(Deserialize)]
struct MultiSearchResponse {
    results: Vec<SearchResponse>,
}

/// HTTP client for the hosted search engine.
pub struct SearchClient {
    http: Client,
    base_url: String,
    api_key: String,
    index: String,
}

impl SearchClient {
    pub fn new(base_url: &str, api_key: &str, index: &str, timeout: Duration) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("winelist-match/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            index: index.to_string(),
        })
    }

    /// Apply index settings: searchable and filterable attributes, ranking
    /// rules with review score as the custom tie-break, and synonym groups.
    pub async fn configure_index(&self) -> Result<(), SearchError> {
        let url = format!("{}/indexes/{}/settings", self.base_url, self.index);
        let settings = json!({
            "searchableAttributes": [
                "searchable_text",
                "normalized_producer",
                "normalized_name",
                "full_name",
            ],
            "filterableAttributes": ["color", "country", "vintage", "score"],
            "sortableAttributes": ["score", "vintage"],
            "rankingRules": [
                "words",
                "typo",
                "proximity",
                "attribute",
                "exactness",
                "score:desc",
            ],
            "typoTolerance": { "enabled": true },
            "synonyms": synonym_map(),
        });

        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&settings)
            .send()
            .await?;
        ensure_success(&response)?;
        Ok(())
    }

    fn hits_from(&self, query: &str, documents: Vec<WineDocument>) -> Vec<SearchHit> {
        let normalized_query = normalize(query);
        documents
            .into_iter()
            .map(|doc| SearchHit {
                confidence: hit_confidence(&normalized_query, &doc.searchable_text, doc.wine.vintage),
                kind: classify_hit(&normalized_query, &doc.searchable_text),
                wine: doc.wine,
            })
            .collect()
    }
}

/// Every term in a group maps to the rest of its group.
fn synonym_map() -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    for group in SYNONYM_GROUPS {
        for term in *group {
            let others: Vec<&str> = group.iter().copied().filter(|t| t != term).collect();
            map.insert(term.to_string(), json!(others));
        }
    }
    map
}

fn ensure_success(response: &reqwest::Response) -> Result<(), SearchError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(SearchError::Unavailable(format!(
            "search service returned HTTP {}",
            response.status()
        )))
    }
}

fn map_send_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::Http(e)
    }
}

#[async_trait]
impl RemoteSearch for SearchClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/indexes/{}/search", self.base_url, self.index);
        let mut body = json!({
            "q": normalize(query),
            "limit": options.limit,
        });
        if let Some(filter) = filter_expression(&options.filters) {
            body["filter"] = json!(filter);
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;
        ensure_success(&response)?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;
        Ok(self.hits_from(query, parsed.hits))
    }

    async fn batch_search(&self, queries: &[String]) -> Result<Vec<Option<SearchHit>>, SearchError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/multi-search", self.base_url);
        let body = json!({
            "queries": queries
                .iter()
                .map(|q| json!({ "indexUid": self.index, "q": normalize(q), "limit": 1 }))
                .collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;
        ensure_success(&response)?;

        let parsed: MultiSearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;
        if parsed.results.len() != queries.len() {
            return Err(SearchError::Parse(format!(
                "expected {} result sets, got {}",
                queries.len(),
                parsed.results.len()
            )));
        }

        Ok(queries
            .iter()
            .zip(parsed.results)
            .map(|(query, result)| self.hits_from(query, result.hits).into_iter().next())
            .collect())
    }

    async fn index_entries(&self, wines: &[Wine]) -> Result<(), SearchError> {
        if wines.is_empty() {
            return Ok(());
        }
        let url = format!("{}/indexes/{}/documents?primaryKey=id", self.base_url, self.index);
        let documents: Vec<WineDocument> = wines.iter().map(WineDocument::from).collect();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&documents)
            .send()
            .await
            .map_err(map_send_error)?;
        ensure_success(&response)?;
        Ok(())
    }

    async fn delete_entry(&self, id: Uuid) -> Result<(), SearchError> {
        let url = format!("{}/indexes/{}/documents/{}", self.base_url, self.index, id);
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_send_error)?;
        ensure_success(&response)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), SearchError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).send().await.map_err(map_send_error)?;
        ensure_success(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wine::WineColor;

    #[test]
    fn test_confidence_full_overlap_with_vintage() {
        // 0.8 + 0.15 + 0.05 = 1.0, capped
        let c = hit_confidence("opus one 2015", "opus one 2015 napa valley", Some(2015));
        assert!((c - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_partial_overlap_no_vintage() {
        let c = hit_confidence("opus two", "opus one napa valley", None);
        assert!((c - (0.8 * 0.5 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_vintage_boost_requires_substring() {
        let with = hit_confidence("barolo 2010", "barolo 2010", Some(2010));
        let without = hit_confidence("barolo 2010", "barolo 2010", Some(2011));
        assert!((with - 0.99).abs() < 1e-9);
        assert!((without - (0.8 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_empty_query_is_baseline() {
        assert!((hit_confidence("", "opus one", None) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_filter_expression() {
        let filters = SearchFilters {
            color: Some(WineColor::Red),
            country: Some("Côte \"d'Or\"".to_string()),
            min_score: Some(90),
            vintage: Some(2015),
        };
        assert_eq!(
            filter_expression(&filters).unwrap(),
            r#"color = "red" AND country = "Côte \"d'Or\"" AND score >= 90 AND vintage = 2015"#
        );
        assert_eq!(filter_expression(&SearchFilters::default()), None);
    }

    #[test]
    fn test_document_denormalized_fields() {
        let mut wine = Wine::new(Uuid::nil(), "Château Margaux", "Pavillon Rouge", Some(2015));
        wine.region = Some("Bordeaux".to_string());
        let doc = WineDocument::from(&wine);
        assert_eq!(doc.full_name, "Château Margaux Pavillon Rouge 2015");
        assert_eq!(doc.searchable_text, "chateau margaux pavillon rouge 2015 bordeaux");
        assert_eq!(doc.normalized_producer, "chateau margaux");
    }

    #[test]
    fn test_synonyms_are_symmetric() {
        let map = synonym_map();
        assert_eq!(map["syrah"], json!(["shiraz"]));
        assert_eq!(map["chard"], json!(["chardonnay"]));
        assert_eq!(map["cab"], json!(["cabernet", "cabernet sauvignon"]));
    }

    #[test]
    fn test_classify_hit() {
        assert_eq!(classify_hit("opus one", "opus one"), RemoteMatchKind::Exact);
        assert_eq!(classify_hit("opus one", "opus one napa"), RemoteMatchKind::Fuzzy);
    }
}
