//! Tiered wine list matching: exact local, fuzzy local, then remote search.
//!
//! Nothing below this API surfaces as an error. Remote failures and timeouts
//! are logged and turn into "no match" for the affected lines.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::models::matching::{MatchKind, MatchResult, ParsedQuery};
use crate::models::search::{SearchFilters, SearchHit, SearchOptions};
use crate::services::candidate_store::CandidateStore;
use crate::services::extractor::parse_query;
use crate::services::search::{RemoteSearch, SearchError};

/// Confidence for an exact local match, vintage or not.
pub const EXACT_CONFIDENCE: f64 = 0.98;

/// Hits requested from the remote service for a single line.
const REMOTE_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
#[error("Invalid match thresholds: {0}")]
pub struct ThresholdError(String);

/// Acceptance thresholds for fuzzy and remote matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    /// Single-line acceptance.
    pub strict: f64,
    /// Acceptance for remote hits found by a batch lookup.
    pub partial: f64,
}

impl MatchThresholds {
    pub fn new(strict: f64, partial: f64) -> Result<Self, ThresholdError> {
        if !(0.0..=1.0).contains(&strict) || !(0.0..=1.0).contains(&partial) {
            return Err(ThresholdError(format!(
                "thresholds must lie in [0, 1], got strict={strict} partial={partial}"
            )));
        }
        if partial > strict {
            return Err(ThresholdError(format!(
                "partial threshold {partial} exceeds strict threshold {strict}"
            )));
        }
        Ok(Self { strict, partial })
    }
}

pub struct MatchResolver {
    store: Arc<CandidateStore>,
    remote: Arc<dyn RemoteSearch>,
    thresholds: MatchThresholds,
    remote_timeout: Duration,
}

impl MatchResolver {
    pub fn new(
        store: Arc<CandidateStore>,
        remote: Arc<dyn RemoteSearch>,
        thresholds: MatchThresholds,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            store,
            remote,
            thresholds,
            remote_timeout,
        }
    }

    pub fn store(&self) -> &Arc<CandidateStore> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<dyn RemoteSearch> {
        &self.remote
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    /// Match one wine list line.
    pub async fn match_wine(&self, text: &str) -> Option<MatchResult> {
        let started = Instant::now();
        metrics::counter!("wine_match_requests_total").increment(1);

        let parsed = parse_query(text);
        let result = match self.match_local(&parsed).await {
            Some(result) => Some(result),
            None => self.match_remote(&parsed).await,
        };

        record_outcome(text, result.as_ref());
        metrics::histogram!("wine_match_seconds").record(started.elapsed().as_secs_f64());
        result
    }

    /// Match every line of a page, sending all local misses to the remote
    /// service in one request. Duplicate lines are looked up independently.
    pub async fn batch_match(&self, texts: &[String]) -> HashMap<String, Option<MatchResult>> {
        let started = Instant::now();
        metrics::counter!("wine_match_requests_total").increment(texts.len() as u64);

        let mut results: HashMap<String, Option<MatchResult>> = HashMap::with_capacity(texts.len());
        let mut unmatched: Vec<(&String, ParsedQuery)> = Vec::new();

        for text in texts {
            let parsed = parse_query(text);
            match self.match_local(&parsed).await {
                Some(result) => {
                    results.insert(text.clone(), Some(result));
                }
                None => unmatched.push((text, parsed)),
            }
        }

        if !unmatched.is_empty() {
            info!(
                total = texts.len(),
                unmatched = unmatched.len(),
                "Resolving local misses with one remote batch search"
            );
            let queries: Vec<String> = unmatched.iter().map(|(_, p)| p.normalized.clone()).collect();
            let hits = match self.with_timeout(self.remote.batch_search(&queries)).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(count = queries.len(), error = %e, "Remote batch search failed, treating lines as unmatched");
                    metrics::counter!("wine_remote_search_failures_total").increment(1);
                    vec![None; queries.len()]
                }
            };

            let mut accepted = Vec::new();
            for ((text, parsed), hit) in unmatched.into_iter().zip(hits) {
                let result = hit
                    .filter(|h| h.confidence >= self.thresholds.partial)
                    .map(|h| MatchResult::new(h.wine, h.confidence, MatchKind::FuzzyRemote, &parsed));
                if let Some(result) = &result {
                    accepted.push(result.wine.clone());
                }
                results.entry(text.clone()).or_insert(result);
            }
            self.store.cache_all(accepted).await;
        }

        for (text, result) in &results {
            record_outcome(text, result.as_ref());
        }
        metrics::histogram!("wine_match_seconds").record(started.elapsed().as_secs_f64());
        results
    }

    async fn match_local(&self, parsed: &ParsedQuery) -> Option<MatchResult> {
        if parsed.normalized.is_empty() {
            return None;
        }

        if let Some(wine) = self.store.find_exact(&parsed.normalized, parsed.vintage).await {
            return Some(MatchResult::new(wine, EXACT_CONFIDENCE, MatchKind::Exact, parsed));
        }

        let (wine, score) = self.store.find_fuzzy(&parsed.normalized).await?;
        if score >= self.thresholds.strict {
            Some(MatchResult::new(wine, score, MatchKind::FuzzyLocal, parsed))
        } else {
            debug!(text = %parsed.raw, score, "Local fuzzy candidate below threshold");
            None
        }
    }

    async fn match_remote(&self, parsed: &ParsedQuery) -> Option<MatchResult> {
        if parsed.normalized.is_empty() {
            return None;
        }

        let options = SearchOptions {
            limit: REMOTE_LIMIT,
            filters: SearchFilters {
                vintage: parsed.vintage,
                ..SearchFilters::default()
            },
        };

        let hits = match self.with_timeout(self.remote.search(&parsed.normalized, &options)).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(text = %parsed.raw, error = %e, "Remote search failed, treating line as unmatched");
                metrics::counter!("wine_remote_search_failures_total").increment(1);
                return None;
            }
        };

        let top: SearchHit = hits.into_iter().next()?;
        if top.confidence < self.thresholds.strict {
            debug!(text = %parsed.raw, confidence = top.confidence, "Remote hit below threshold");
            return None;
        }

        self.store.cache(top.wine.clone()).await;
        Some(MatchResult::new(top.wine, top.confidence, MatchKind::FuzzyRemote, parsed))
    }

    async fn with_timeout<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, SearchError>>,
    ) -> Result<T, SearchError> {
        tokio::time::timeout(self.remote_timeout, call)
            .await
            .unwrap_or(Err(SearchError::Timeout))
    }
}

fn record_outcome(text: &str, result: Option<&MatchResult>) {
    match result {
        Some(result) => {
            metrics::counter!("wine_match_results_total", "kind" => result.kind.to_string()).increment(1);
            debug!(
                text,
                wine_id = %result.wine.id,
                kind = %result.kind,
                confidence = result.confidence,
                "Matched wine list line"
            );
        }
        None => {
            metrics::counter!("wine_match_misses_total").increment(1);
            debug!(text, "No match for wine list line");
        }
    }
}
