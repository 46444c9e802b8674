//! uptime-sync — reconciles the client-held site tree with backend-pushed
//! monitor status events.
//!
//! # Architecture
//!
//! ```text
//! EventSource ──(status-changed / started / stopped)──▶ StatusUpdateManager
//!                                                         ├── validate_status_changed()
//!                                                         ├── patch::locate() + patch::apply()
//!                                                         ├── SiteStore::set_sites()
//!                                                         ├── UpdateCallback (guarded)
//!                                                         └── with_fallback() → ResyncFn
//! ```
//!
//! # Fallback
//!
//! The incremental path is abandoned for a full resync whenever the
//! payload is malformed, the referenced site or monitor is not in the
//! local collection, or storing the patch fails. Resync failures and
//! callback panics are swallowed; nothing is propagated back to the
//! event source. The worst case is a collection that stays stale until
//! the next successful event or resync.

pub mod error;
pub mod event;
pub mod fallback;
pub mod manager;
pub mod patch;
pub mod store;
pub mod subscription;

pub use error::{SyncError, SyncResult};
pub use event::{InvalidEvent, StatusChangedEvent, validate_status_changed};
pub use fallback::{Fallback, FallbackReason, with_fallback};
pub use manager::{
    DevModeFn, LifecycleOutcome, StatusChangeOutcome, StatusUpdateManager, SyncStats,
    UpdateCallback,
};
pub use store::{ResyncFn, SiteStore};
pub use subscription::{BoxFuture, EventHandler, EventKind, EventSource, Subscription};
