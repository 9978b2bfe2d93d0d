//! TTL-bounded, lazily refreshed snapshot of the homeowners table.
//!
//! [`DatasetCache`] holds at most one [`Dataset`] behind an `Arc`. A read
//! that finds the snapshot missing or older than the TTL refreshes it
//! inline. Refreshes are serialized by an async mutex with a double check,
//! so a burst of stale readers costs one fetch. A stale reader that finds a
//! refresh already running gets the previous snapshot at once; only readers
//! with nothing to fall back on wait for the refresh. Readers that find a
//! fresh snapshot only take the read lock long enough to clone the `Arc`.
//!
//! A failed fetch never replaces the snapshot and never advances the
//! refresh clock: the previous data keeps being served and the next read
//! tries again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use utoipa::ToSchema;

use super::Dataset;
use crate::loader::DataLoader;

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<Dataset>>,
    last_refresh: Option<Instant>,
    last_refresh_at: Option<DateTime<Utc>>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.snapshot.is_some()
            && self
                .last_refresh
                .is_some_and(|at| at.elapsed() <= ttl)
    }
}

/// Point-in-time view of the cache, for health reporting.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheStatus {
    /// Rows in the current snapshot (0 when none is loaded).
    pub rows: usize,
    /// Whether any snapshot has been loaded.
    pub loaded: bool,
    /// Whether the next read will attempt a refresh.
    pub stale: bool,
    /// Wall-clock time of the last successful refresh.
    pub last_refresh_at: Option<DateTime<Utc>>,
    /// Configured TTL in seconds.
    pub ttl_secs: u64,
}

/// Owns the current dataset snapshot and its refresh policy.
#[derive(Debug)]
pub struct DatasetCache {
    loader: Arc<dyn DataLoader>,
    ttl: Duration,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

impl DatasetCache {
    /// Creates an empty cache. Nothing is fetched until the first
    /// [`get`](Self::get).
    #[must_use]
    pub fn new(loader: Arc<dyn DataLoader>, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the current snapshot, refreshing it first if missing or
    /// stale.
    ///
    /// Never fails: on loader error the previous snapshot is returned, or
    /// an empty dataset when nothing was ever loaded.
    pub async fn get(&self) -> Arc<Dataset> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return snapshot;
        }

        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(previous) = self.current_snapshot().await {
                    tracing::debug!("refresh in progress, serving previous snapshot");
                    return previous;
                }
                self.refresh_lock.lock().await
            }
        };
        // Another caller may have refreshed while we waited for the guard.
        if let Some(snapshot) = self.fresh_snapshot().await {
            return snapshot;
        }

        match self.loader.fetch_all().await {
            Ok(rows) => {
                let (dataset, skipped) = Dataset::from_raw(rows);
                let snapshot = Arc::new(dataset);
                let mut state = self.state.write().await;
                state.snapshot = Some(Arc::clone(&snapshot));
                state.last_refresh = Some(Instant::now());
                state.last_refresh_at = Some(Utc::now());
                drop(state);

                tracing::info!(
                    source = %self.loader.describe(),
                    rows = snapshot.len(),
                    skipped,
                    "dataset refreshed"
                );
                snapshot
            }
            Err(err) => {
                let previous = self.current_snapshot().await;
                tracing::warn!(
                    source = %self.loader.describe(),
                    error = %err,
                    serving_previous = previous.is_some(),
                    "dataset refresh failed"
                );
                previous.unwrap_or_else(|| Arc::new(Dataset::empty()))
            }
        }
    }

    /// Reports the cache state without triggering a refresh.
    pub async fn status(&self) -> CacheStatus {
        let state = self.state.read().await;
        CacheStatus {
            rows: state.snapshot.as_ref().map_or(0, |s| s.len()),
            loaded: state.snapshot.is_some(),
            stale: !state.is_fresh(self.ttl),
            last_refresh_at: state.last_refresh_at,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    async fn current_snapshot(&self) -> Option<Arc<Dataset>> {
        self.state.read().await.snapshot.clone()
    }

    async fn fresh_snapshot(&self) -> Option<Arc<Dataset>> {
        let state = self.state.read().await;
        if state.is_fresh(self.ttl) {
            state.snapshot.clone()
        } else {
            None
        }
    }
}
