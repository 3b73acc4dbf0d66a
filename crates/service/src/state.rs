//! Shared application state.
//!
//! Thread-safe handles used by the API handlers: the beacon client, a
//! per-slot cache of resolved historical roots, and request counters.

use dashmap::DashMap;
use parking_lot::RwLock;
use proof_gen::beacon_client::{BeaconClient, BeaconClientError};
use proof_gen::HistoricalRoots;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    /// Beacon node client.
    client: BeaconClient,
    /// Historical roots keyed by the slot of the state they prepare.
    roots_cache: DashMap<u64, HistoricalRoots>,
    /// Successfully generated proofs since startup.
    proofs_generated: AtomicU64,
    /// Failed requests since startup.
    failures: AtomicU64,
    /// Service start time.
    start_time: std::time::Instant,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl AppState {
    /// Create new application state around a beacon client.
    #[must_use]
    pub fn new(client: BeaconClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                client,
                roots_cache: DashMap::new(),
                proofs_generated: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                start_time: std::time::Instant::now(),
                last_error: RwLock::new(None),
            }),
        }
    }

    /// The beacon node client.
    #[must_use]
    pub fn client(&self) -> &BeaconClient {
        &self.inner.client
    }

    /// Historical roots for a state at `slot`, resolved from the node's
    /// header at `slot - 8` and cached per slot. The cache is insert-only;
    /// the roots for a given slot never change once finalized.
    pub async fn historical_roots(&self, slot: u64) -> Result<HistoricalRoots, BeaconClientError> {
        if let Some(cached) = self.inner.roots_cache.get(&slot) {
            return Ok(*cached);
        }
        let roots = self.inner.client.get_historical_roots(slot).await?;
        self.inner.roots_cache.insert(slot, roots);
        Ok(roots)
    }

    /// Seed the cache (also used by tests).
    pub fn cache_roots(&self, slot: u64, roots: HistoricalRoots) {
        self.inner.roots_cache.insert(slot, roots);
    }

    /// Record a successful proof generation.
    pub fn record_success(&self) {
        self.inner.proofs_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request.
    pub fn record_failure(&self, error: &str) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
        *self.inner.last_error.write() = Some(error.to_string());
    }

    #[must_use]
    pub fn proofs_generated(&self) -> u64 {
        self.inner.proofs_generated.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Get last error.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().clone()
    }
}
