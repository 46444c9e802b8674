//! MemorySiteStore — shared in-memory site collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use uptime_core::{Site, SiteList};
use uptime_sync::{SiteStore, SyncResult};

/// Thread-safe site collection. Clones share the same state.
///
/// Reads hand out a cheap clone of the `Arc` list; writes swap the whole
/// list. `version` increases by one per write so consumers can tell a
/// replaced collection from an unchanged one.
#[derive(Clone, Default)]
pub struct MemorySiteStore {
    sites: Arc<RwLock<SiteList>>,
    version: Arc<AtomicU64>,
}

impl MemorySiteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `sites`.
    pub fn from_sites(sites: impl IntoIterator<Item = Site>) -> Self {
        let store = Self::new();
        *store.sites.write().expect("sites lock") = sites.into_iter().map(Arc::new).collect();
        store
    }

    /// Number of writes applied so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Number of sites held.
    pub fn len(&self) -> usize {
        self.sites.read().expect("sites lock").len()
    }

    /// Whether the store holds no sites.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SiteStore for MemorySiteStore {
    fn sites(&self) -> SiteList {
        self.sites.read().expect("sites lock").clone()
    }

    fn set_sites(&self, next: SiteList) -> SyncResult<()> {
        let count = next.len();
        *self.sites.write().expect("sites lock") = next;
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(sites = count, version, "site collection replaced");
        Ok(())
    }
}
