//! The data manager: the one place the UI goes for library data.
//!
//! All heavy work (normalization, cache I/O, projection, search) runs on the
//! worker pool, so callers only ever await. Results carry no identity of
//! their own; callers that may race (row loads, searches) tag requests with a
//! [`Generation`] and drop anything that is no longer current.
//!
//! Load pipeline, strictly in order: fetch → normalize → save → return.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::LibrarySource;
use crate::cache::CacheStore;
use crate::error::LoadError;
use crate::library::LibrarySnapshot;
use crate::normalize::{normalize, Layouts, NormalizeReport};
use crate::pool::WorkerPool;
use crate::search::{self, SearchHit};
use crate::view::{self, View, ViewKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Use the cache when there is one, otherwise fetch.
    PreferCache,
    /// Always fetch; fall back to the cache if that fails.
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub snapshot: Arc<LibrarySnapshot>,
    pub source: LoadSource,
    /// Set when a refresh failed and the cache was used instead.
    pub warning: Option<String>,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Load,
    Rows,
    Search,
}

impl RequestKind {
    fn slot(self) -> usize {
        match self {
            RequestKind::Load => 0,
            RequestKind::Rows => 1,
            RequestKind::Search => 2,
        }
    }
}

/// Tag for one request; only the latest per kind is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    pub kind: RequestKind,
    pub seq: u64,
}

struct Inner<S> {
    source: S,
    cache: CacheStore,
    pool: WorkerPool,
    layouts: Layouts,
    /// Serializes every touch of the cache file.
    cache_lock: Mutex<()>,
    generations: [AtomicU64; 3],
}

pub struct DataManager<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for DataManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: LibrarySource> DataManager<S> {
    pub fn new(source: S, cache: CacheStore, pool: WorkerPool, layouts: Layouts) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                cache,
                pool,
                layouts,
                cache_lock: Mutex::new(()),
                generations: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    // ── Generations ──────────────────────────────────────────────────────────

    /// Start a new request of `kind`, superseding any earlier one.
    pub fn begin(&self, kind: RequestKind) -> Generation {
        let seq = self.inner.generations[kind.slot()].fetch_add(1, Ordering::SeqCst) + 1;
        Generation { kind, seq }
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.inner.generations[generation.kind.slot()].load(Ordering::SeqCst) == generation.seq
    }

    // ── Library ──────────────────────────────────────────────────────────────

    pub async fn has_cache(&self) -> bool {
        let _guard = self.inner.cache_lock.lock().await;
        let cache = self.inner.cache.clone();
        self.inner
            .pool
            .run(move || cache.has_cache())
            .await
            .unwrap_or(false)
    }

    pub async fn load_library(&self, mode: LoadMode) -> Result<LoadOutcome, LoadError> {
        if mode == LoadMode::PreferCache && self.has_cache().await {
            let snapshot = self.load_cached().await;
            if !snapshot.is_empty() {
                info!("library loaded from cache");
                return Ok(LoadOutcome {
                    snapshot: Arc::new(snapshot),
                    source: LoadSource::Cache,
                    warning: None,
                    report: NormalizeReport::default(),
                });
            }
        }

        match self.fetch_and_store().await {
            Ok((snapshot, report)) => Ok(LoadOutcome {
                snapshot,
                source: LoadSource::Network,
                warning: None,
                report,
            }),
            Err(reason) => {
                warn!("library fetch failed: {}", reason);
                let cached = self.load_cached().await;
                if cached.is_empty() {
                    return Err(LoadError::NoLibrary { reason });
                }
                info!("using cached library after failed fetch");
                Ok(LoadOutcome {
                    snapshot: Arc::new(cached),
                    source: LoadSource::Cache,
                    warning: Some(format!("refresh failed, showing cached library: {}", reason)),
                    report: NormalizeReport::default(),
                })
            }
        }
    }

    pub async fn clear_cache(&self) -> Result<(), crate::error::CacheError> {
        let _guard = self.inner.cache_lock.lock().await;
        self.inner.cache.clear()
    }

    async fn load_cached(&self) -> LibrarySnapshot {
        let _guard = self.inner.cache_lock.lock().await;
        let cache = self.inner.cache.clone();
        match self.inner.pool.run(move || cache.load()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("cache read failed: {}", e);
                LibrarySnapshot::default()
            }
        }
    }

    async fn fetch_and_store(&self) -> Result<(Arc<LibrarySnapshot>, NormalizeReport), String> {
        let raw = self
            .inner
            .pool
            .run_async(self.inner.source.fetch())
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())?;

        let layouts = self.inner.layouts;
        let normalized = self
            .inner
            .pool
            .run(move || normalize(&raw, &layouts))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())?;
        let snapshot = Arc::new(normalized.snapshot);

        {
            let _guard = self.inner.cache_lock.lock().await;
            let cache = self.inner.cache.clone();
            let to_save = snapshot.clone();
            if let Err(e) = self.inner.pool.run(move || cache.save(&to_save)).await {
                warn!("cache write task failed: {}", e);
            }
        }

        Ok((snapshot, normalized.report))
    }

    // ── Views ────────────────────────────────────────────────────────────────

    pub async fn rows(&self, kind: ViewKind, snapshot: Arc<LibrarySnapshot>) -> View {
        let fallback = View::empty(kind.clone());
        match self
            .inner
            .pool
            .run(move || view::project(kind, &snapshot))
            .await
        {
            Ok(view) => {
                debug!("projected {} {} rows", view.len(), view.kind.label());
                view
            }
            Err(e) => {
                warn!("projection failed: {}", e);
                fallback
            }
        }
    }

    pub async fn search(
        &self,
        snapshot: Arc<LibrarySnapshot>,
        query: String,
        limit: usize,
    ) -> Vec<SearchHit> {
        match self
            .inner
            .pool
            .run(move || search::search(&snapshot, &query, limit))
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("search failed: {}", e);
                Vec::new()
            }
        }
    }
}
