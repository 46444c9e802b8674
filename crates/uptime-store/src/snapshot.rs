//! SnapshotSource — JSON-file backed authoritative site list.
//!
//! A snapshot is a JSON array of sites in wire form. Full resync reloads
//! the file and replaces the store's collection with what it contains.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use uptime_core::{Site, SiteList};
use uptime_sync::{ResyncFn, SiteStore, SyncError};

use crate::error::{StoreError, StoreResult};

/// Reads the authoritative site collection from a file.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the snapshot.
    ///
    /// Site identifiers must be unique.
    pub fn load(&self) -> StoreResult<SiteList> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let sites: Vec<Site> = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut seen = HashSet::new();
        for site in &sites {
            if !seen.insert(site.identifier.as_str()) {
                return Err(StoreError::DuplicateSite(site.identifier.clone()));
            }
        }

        debug!(path = ?self.path, sites = sites.len(), "snapshot loaded");
        Ok(sites.into_iter().map(Arc::new).collect())
    }

    /// Write a collection as the new snapshot.
    pub fn save(&self, sites: &[Arc<Site>]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(sites)?;
        std::fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Build the full-resync function that reloads this snapshot into
    /// `store`.
    pub fn resync_into(&self, store: Arc<dyn SiteStore>) -> ResyncFn {
        let source = self.clone();
        Arc::new(move || {
            let source = source.clone();
            let store = store.clone();
            Box::pin(async move {
                let sites = source
                    .load()
                    .map_err(|e| SyncError::Resync(e.to_string()))?;
                let count = sites.len();
                store.set_sites(sites)?;
                info!(path = ?source.path, sites = count, "full resync complete");
                Ok::<(), SyncError>(())
            })
        })
    }
}
