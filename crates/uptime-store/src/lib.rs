//! uptime-store — the client-held site collection and its
//! authoritative source.
//!
//! `MemorySiteStore` is the accessor the status update manager patches.
//! `SnapshotSource` reads the authoritative site list from a JSON file
//! and provides the full-resync function that replaces the store's
//! contents wholesale.

pub mod error;
pub mod memory;
pub mod snapshot;

pub use error::{StoreError, StoreResult};
pub use memory::MemorySiteStore;
pub use snapshot::SnapshotSource;
