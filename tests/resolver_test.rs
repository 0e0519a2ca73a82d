//! Match resolver behaviour against an in-process search service double.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;
use winelist_match::models::matching::MatchKind;
use winelist_match::models::search::{RemoteMatchKind, SearchHit, SearchOptions};
use winelist_match::models::wine::Wine;
use winelist_match::services::candidate_store::CandidateStore;
use winelist_match::services::resolver::{MatchResolver, MatchThresholds, EXACT_CONFIDENCE};
use winelist_match::services::search::{RemoteSearch, SearchError};

/// Search service double keyed by normalized query text.
#[derive(Default)]
struct FakeSearch {
    hits: HashMap<String, SearchHit>,
    fail: bool,
    delay: Option<Duration>,
    search_calls: AtomicUsize,
    last_options: Mutex<Option<SearchOptions>>,
    batch_calls: Mutex<Vec<Vec<String>>>,
}

impl FakeSearch {
    fn with_hit(mut self, query: &str, wine: Wine, confidence: f64) -> Self {
        self.hits.insert(
            query.to_string(),
            SearchHit {
                wine,
                confidence,
                kind: RemoteMatchKind::Fuzzy,
            },
        );
        self
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    async fn respond(&self) -> Result<(), SearchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SearchError::Unavailable("search service returned HTTP 503".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSearch for FakeSearch {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>, SearchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        self.respond().await?;
        Ok(self.hits.get(query).cloned().into_iter().collect())
    }

    async fn batch_search(&self, queries: &[String]) -> Result<Vec<Option<SearchHit>>, SearchError> {
        self.batch_calls.lock().unwrap().push(queries.to_vec());
        self.respond().await?;
        Ok(queries.iter().map(|q| self.hits.get(q).cloned()).collect())
    }

    async fn index_entries(&self, _wines: &[Wine]) -> Result<(), SearchError> {
        Ok(())
    }

    async fn delete_entry(&self, _id: Uuid) -> Result<(), SearchError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), SearchError> {
        Ok(())
    }
}

fn wine(id: u128, producer: &str, name: &str, vintage: Option<i32>) -> Wine {
    Wine::new(Uuid::from_u128(id), producer, name, vintage)
}

fn resolver(store: Arc<CandidateStore>, search: Arc<FakeSearch>) -> MatchResolver {
    MatchResolver::new(
        store,
        search,
        MatchThresholds::new(0.7, 0.6).unwrap(),
        Duration::from_millis(100),
    )
}

#[tokio::test]
async fn test_exact_local_match_skips_remote() {
    let store = Arc::new(CandidateStore::in_memory());
    store.cache(wine(1, "Opus One", "", Some(2015))).await;
    let search = Arc::new(FakeSearch::default());
    let resolver = resolver(store, search.clone());

    let result = resolver.match_wine("Opus One $350").await.unwrap();

    assert_eq!(result.kind, MatchKind::Exact);
    assert_eq!(result.confidence, EXACT_CONFIDENCE);
    assert_eq!(result.vintage, Some(2015));
    assert_eq!(result.list_price, Some(350.0));
    assert_eq!(search.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fuzzy_local_match_above_threshold() {
    let store = Arc::new(CandidateStore::in_memory());
    store.cache(wine(1, "Domaine Leflaive", "Puligny Montrachet", None)).await;
    let search = Arc::new(FakeSearch::default());
    let resolver = resolver(store, search.clone());

    let result = resolver.match_wine("Domaine Leflaive Puligny-Montrachet").await.unwrap();
    assert_eq!(result.kind, MatchKind::Exact);

    let result = resolver.match_wine("Domaine Leflaive Puligny Montrachat").await.unwrap();
    assert_eq!(result.kind, MatchKind::FuzzyLocal);
    assert!(result.confidence >= 0.7);
    assert_eq!(search.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_weak_local_candidate_falls_through_to_remote() {
    let store = Arc::new(CandidateStore::in_memory());
    store.cache(wine(1, "Chateau Margaux", "", Some(2010))).await;
    // "chateau margau" scores about 0.57 locally, under the 0.7 threshold
    let search = Arc::new(FakeSearch::default());
    let resolver = resolver(store, search.clone());

    assert!(resolver.match_wine("Chateau Margau").await.is_none());
    assert_eq!(search.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remote_hit_is_cached_locally() {
    let store = Arc::new(CandidateStore::in_memory());
    let monte_bello = wine(5, "Ridge", "Monte Bello", Some(2014));
    let search = Arc::new(FakeSearch::default().with_hit("ridge monte bello 2014", monte_bello.clone(), 0.95));
    let resolver = resolver(store.clone(), search.clone());

    let result = resolver.match_wine("Ridge Monte Bello 2014 $280").await.unwrap();
    assert_eq!(result.kind, MatchKind::FuzzyRemote);
    assert_eq!(result.wine, monte_bello);
    assert_eq!(store.get(monte_bello.id).await, Some(monte_bello));

    let options = search.last_options.lock().unwrap().clone().unwrap();
    assert_eq!(options.filters.vintage, Some(2014));

    // The write-back lets the next lookup resolve without the remote service.
    let again = resolver.match_wine("Ridge Monte Bello").await.unwrap();
    assert_eq!(again.kind, MatchKind::Exact);
    assert_eq!(search.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_threshold_boundary_is_inclusive() {
    let store = Arc::new(CandidateStore::in_memory());
    let search = Arc::new(
        FakeSearch::default()
            .with_hit("at threshold", wine(1, "At", "Threshold", None), 0.7)
            .with_hit("below threshold", wine(2, "Below", "Threshold", None), 0.6999),
    );
    let resolver = resolver(store, search);

    let accepted = resolver.match_wine("At Threshold").await.unwrap();
    assert_eq!(accepted.confidence, 0.7);
    assert!(resolver.match_wine("Below Threshold").await.is_none());
}

#[tokio::test]
async fn test_remote_failure_is_no_match() {
    let store = Arc::new(CandidateStore::in_memory());
    let search = Arc::new(FakeSearch::failing());
    let resolver = resolver(store, search.clone());

    assert!(resolver.match_wine("Sassicaia 2016").await.is_none());
    assert_eq!(search.search_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remote_timeout_is_no_match() {
    let store = Arc::new(CandidateStore::in_memory());
    let search = Arc::new(FakeSearch {
        delay: Some(Duration::from_millis(500)),
        ..FakeSearch::default().with_hit("sassicaia 2016", wine(1, "Tenuta San Guido", "Sassicaia", Some(2016)), 0.9)
    });
    let resolver = resolver(store, search);

    assert!(resolver.match_wine("Sassicaia 2016").await.is_none());
}

#[tokio::test]
async fn test_batch_issues_single_remote_call() {
    let store = Arc::new(CandidateStore::in_memory());
    let search = Arc::new(FakeSearch::default());
    let resolver = resolver(store, search.clone());

    let texts: Vec<String> = ["Barolo '98", "Sancerre $62", "Krug Grande Cuvée", "Cloudy Bay 2022"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let results = resolver.batch_match(&texts).await;

    assert_eq!(results.len(), 4);
    assert!(results.values().all(Option::is_none));
    assert_eq!(search.search_calls.load(Ordering::SeqCst), 0);

    let batches = search.batch_calls.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0],
        vec!["barolo 98", "sancerre", "krug grande cuvee", "cloudy bay 2022"]
    );
}

#[tokio::test]
async fn test_batch_only_sends_local_misses() {
    let store = Arc::new(CandidateStore::in_memory());
    store.cache(wine(1, "Opus One", "", Some(2015))).await;
    let cloudy_bay = wine(2, "Cloudy Bay", "Sauvignon Blanc", Some(2022));
    let search = Arc::new(FakeSearch::default().with_hit("cloudy bay sb 2022", cloudy_bay.clone(), 0.65));
    let resolver = resolver(store.clone(), search.clone());

    let texts = vec!["Opus One".to_string(), "Cloudy Bay SB 2022 $58".to_string()];
    let results = resolver.batch_match(&texts).await;

    assert_eq!(results["Opus One"].as_ref().unwrap().kind, MatchKind::Exact);
    // 0.65 clears the looser batch threshold but not the single-line one
    let remote = results["Cloudy Bay SB 2022 $58"].as_ref().unwrap();
    assert_eq!(remote.kind, MatchKind::FuzzyRemote);
    assert_eq!(remote.list_price, Some(58.0));

    assert_eq!(*search.batch_calls.lock().unwrap(), vec![vec!["cloudy bay sb 2022".to_string()]]);
    assert_eq!(store.get(cloudy_bay.id).await, Some(cloudy_bay));
}

#[tokio::test]
async fn test_batch_below_partial_threshold_rejected() {
    let store = Arc::new(CandidateStore::in_memory());
    let search = Arc::new(FakeSearch::default().with_hit("mystery red", wine(1, "Mystery", "Red", None), 0.59));
    let resolver = resolver(store.clone(), search);

    let results = resolver.batch_match(&["Mystery Red".to_string()]).await;
    assert!(results["Mystery Red"].is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_batch_remote_failure_leaves_all_unmatched() {
    let store = Arc::new(CandidateStore::in_memory());
    store.cache(wine(1, "Opus One", "", None)).await;
    let search = Arc::new(FakeSearch::failing());
    let resolver = resolver(store, search.clone());

    let texts = vec!["Opus One".to_string(), "Barolo '05".to_string(), "Tignanello".to_string()];
    let results = resolver.batch_match(&texts).await;

    assert!(results["Opus One"].is_some());
    assert!(results["Barolo '05"].is_none());
    assert!(results["Tignanello"].is_none());
    assert_eq!(search.batch_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_duplicates_looked_up_independently() {
    let store = Arc::new(CandidateStore::in_memory());
    let search = Arc::new(FakeSearch::default());
    let resolver = resolver(store, search.clone());

    let texts = vec!["Tignanello".to_string(), "Tignanello".to_string()];
    let results = resolver.batch_match(&texts).await;

    assert_eq!(results.len(), 1);
    assert_eq!(search.batch_calls.lock().unwrap()[0].len(), 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_store() {
    let store = Arc::new(CandidateStore::in_memory());
    store.cache(wine(1, "Opus One", "", Some(2015))).await;
    let search = Arc::new(FakeSearch::default());
    let resolver = Arc::new(resolver(store, search));

    let calls = (0..16).map(|_| {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.match_wine("opus one").await })
    });
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().unwrap().kind, MatchKind::Exact);
    }
}
