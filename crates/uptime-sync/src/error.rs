//! Error types for the reconciliation layer.

use thiserror::Error;

use crate::subscription::EventKind;

/// Result type alias for reconciliation operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by collaborators of the status update manager.
///
/// None of these ever escape an event handler; they decide whether the
/// manager falls back to a full resync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to subscribe to {kind} events: {reason}")]
    Subscribe { kind: EventKind, reason: String },

    #[error("failed to release subscription: {0}")]
    Unsubscribe(String),

    #[error("site store rejected update: {0}")]
    Store(String),

    #[error("full resync failed: {0}")]
    Resync(String),
}
