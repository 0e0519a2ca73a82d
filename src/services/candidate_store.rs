//! Local candidate cache of catalog wines with an inverted term index.
//!
//! All reads and writes go through one async mutex, so callers can share the
//! store freely while state changes stay single-writer. Only the wine set is
//! persisted; the term index is rebuilt from it on load.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::wine::Wine;
use crate::services::normalizer::{indexable_tokens, normalize, tokenize};
use crate::services::similarity::similarity;

/// Internal floor below which fuzzy candidates are discarded.
pub const FUZZY_FLOOR: f64 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache file serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Default)]
struct StoreState {
    wines: BTreeMap<Uuid, Wine>,
    terms: HashMap<String, BTreeSet<Uuid>>,
    /// Bumped on every persisted change; orders concurrent saves.
    generation: u64,
}

impl StoreState {
    fn upsert(&mut self, wine: Wine) {
        // Tokens of a superseded entry are left in place.
        for token in indexable_tokens(&wine.search_text()) {
            self.terms.entry(token.to_string()).or_default().insert(wine.id);
        }
        self.wines.insert(wine.id, wine);
    }

    fn snapshot(&self) -> (Vec<Wine>, u64) {
        (self.wines.values().cloned().collect(), self.generation)
    }
}

/// Writes cache snapshots atomically, never replacing a newer one with an older one.
struct Persister {
    path: PathBuf,
    written: Mutex<u64>,
}

impl Persister {
    async fn write(&self, wines: &[Wine], generation: u64) -> Result<bool, StoreError> {
        let mut written = self.written.lock().await;
        if generation < *written {
            return Ok(false);
        }

        let payload = serde_json::to_vec_pretty(wines)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        *written = generation;
        Ok(true)
    }
}

/// Session-scoped cache of wines previously matched or fetched remotely.
pub struct CandidateStore {
    state: Arc<Mutex<StoreState>>,
    persister: Option<Arc<Persister>>,
    loaded: watch::Receiver<bool>,
}

impl CandidateStore {
    /// Store without durable backing. Counts as loaded immediately.
    pub fn in_memory() -> Self {
        let (_tx, loaded) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            persister: None,
            loaded,
        }
    }

    /// Store backed by a JSON cache file.
    ///
    /// Loading runs in the background; queries issued before it completes see
    /// whatever has been cached so far. A missing or corrupt file yields an
    /// empty store. Must be called from within a Tokio runtime.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = Arc::new(Mutex::new(StoreState::default()));
        let (loaded_tx, loaded) = watch::channel(false);

        let load_state = Arc::clone(&state);
        let load_path = path.clone();
        tokio::spawn(async move {
            match read_cache_file(&load_path).await {
                Ok(wines) => {
                    let mut state = load_state.lock().await;
                    let count = wines.len();
                    for wine in wines {
                        // Entries cached while loading are newer than the file.
                        if !state.wines.contains_key(&wine.id) {
                            state.upsert(wine);
                        }
                    }
                    metrics::gauge!("wine_cache_entries").set(state.wines.len() as f64);
                    info!(path = %load_path.display(), count, "Loaded local wine cache");
                }
                Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %load_path.display(), "No local wine cache file, starting empty");
                }
                Err(e) => {
                    warn!(path = %load_path.display(), error = %e, "Failed to load local wine cache, starting empty");
                }
            }
            let _ = loaded_tx.send(true);
        });

        Self {
            state,
            persister: Some(Arc::new(Persister {
                path,
                written: Mutex::new(0),
            })),
            loaded,
        }
    }

    /// Resolves once the background load has finished (successfully or not).
    pub async fn wait_until_loaded(&self) {
        let mut loaded = self.loaded.clone();
        // Sender dropped after sending true; either outcome means done.
        let _ = loaded.wait_for(|done| *done).await;
    }

    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    /// Insert or replace one wine. Does not trigger a save.
    pub async fn cache(&self, wine: Wine) {
        let mut state = self.state.lock().await;
        state.upsert(wine);
        state.generation += 1;
        metrics::gauge!("wine_cache_entries").set(state.wines.len() as f64);
    }

    /// Insert or replace many wines, then save in the background.
    pub async fn cache_all(&self, wines: Vec<Wine>) {
        if wines.is_empty() {
            return;
        }
        {
            let mut state = self.state.lock().await;
            for wine in wines {
                state.upsert(wine);
            }
            state.generation += 1;
            metrics::gauge!("wine_cache_entries").set(state.wines.len() as f64);
        }
        self.schedule_save();
    }

    /// Drop every cached wine and the term index, and persist the empty set.
    pub async fn clear(&self) {
        {
            let mut state = self.state.lock().await;
            state.wines.clear();
            state.terms.clear();
            state.generation += 1;
        }
        metrics::gauge!("wine_cache_entries").set(0.0);
        info!("Local wine cache cleared");
        self.schedule_save();
    }

    pub async fn get(&self, id: Uuid) -> Option<Wine> {
        self.state.lock().await.wines.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.wines.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All cached wines in identifier order.
    pub async fn entries(&self) -> Vec<Wine> {
        self.state.lock().await.wines.values().cloned().collect()
    }

    /// Wine whose normalized "producer name" equals the normalized text.
    ///
    /// With a vintage the entry's vintage must be equal; without one any
    /// vintage matches. Several hits resolve to the lowest identifier.
    pub async fn find_exact(&self, text: &str, vintage: Option<i32>) -> Option<Wine> {
        let query = normalize(text);
        if query.is_empty() {
            return None;
        }

        let state = self.state.lock().await;
        state
            .wines
            .values()
            .filter(|wine| vintage.is_none() || wine.vintage == vintage)
            .find(|wine| wine.display_name() == query)
            .cloned()
    }

    /// Best-scoring wine among index candidates, if it clears [`FUZZY_FLOOR`].
    ///
    /// Candidates are wines indexed under any query token, or under any indexed
    /// term that contains or is contained in a query token. Equal scores keep
    /// the lowest identifier.
    pub async fn find_fuzzy(&self, text: &str) -> Option<(Wine, f64)> {
        let query = normalize(text);
        let tokens: Vec<&str> = tokenize(&query).collect();
        if tokens.is_empty() {
            return None;
        }

        let state = self.state.lock().await;
        let mut candidates: BTreeSet<Uuid> = BTreeSet::new();
        for token in &tokens {
            if let Some(ids) = state.terms.get(*token) {
                candidates.extend(ids);
            }
        }
        for (term, ids) in &state.terms {
            if tokens.iter().any(|t| term.contains(t) || t.contains(term.as_str())) {
                candidates.extend(ids);
            }
        }

        let mut best: Option<(&Wine, f64)> = None;
        for id in &candidates {
            let Some(wine) = state.wines.get(id) else {
                continue;
            };
            let score = similarity(&query, &wine.display_name());
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((wine, score));
            }
        }

        best.filter(|(_, score)| *score >= FUZZY_FLOOR)
            .map(|(wine, score)| (wine.clone(), score))
    }

    /// Write the current wine set now and wait for it.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let Some(persister) = &self.persister else {
            return Ok(());
        };
        self.wait_until_loaded().await;
        let (wines, generation) = self.state.lock().await.snapshot();
        persister.write(&wines, generation).await?;
        Ok(())
    }

    fn schedule_save(&self) {
        let Some(persister) = self.persister.clone() else {
            return;
        };
        let state = Arc::clone(&self.state);
        let loaded = self.loaded.clone();

        tokio::spawn(async move {
            // Saving before the load finishes would drop the file's entries.
            let mut loaded = loaded;
            let _ = loaded.wait_for(|done| *done).await;

            let (wines, generation) = state.lock().await.snapshot();
            match persister.write(&wines, generation).await {
                Ok(true) => debug!(count = wines.len(), generation, "Saved local wine cache"),
                Ok(false) => debug!(generation, "Skipped stale wine cache snapshot"),
                Err(e) => warn!(path = %persister.path.display(), error = %e, "Failed to save local wine cache"),
            }
        });
    }
}

async fn read_cache_file(path: &Path) -> Result<Vec<Wine>, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
