//! Site store accessor seam.

use std::sync::Arc;

use uptime_core::SiteList;

use crate::error::SyncResult;
use crate::subscription::BoxFuture;

/// Read/replace access to the client-held site collection.
///
/// Implementations replace the collection wholesale; the manager never
/// mutates a returned site or monitor in place.
pub trait SiteStore: Send + Sync {
    /// Current collection.
    fn sites(&self) -> SiteList;

    /// Replace the collection.
    fn set_sites(&self, next: SiteList) -> SyncResult<()>;

    /// Replace the collection with a function of the current one.
    fn update_sites(&self, update: &dyn Fn(&SiteList) -> SiteList) -> SyncResult<()> {
        let next = update(&self.sites());
        self.set_sites(next)
    }
}

/// Reloads the entire site collection from the authoritative backend.
pub type ResyncFn = Arc<dyn Fn() -> BoxFuture<'static, SyncResult<()>> + Send + Sync>;
