//! Event subscription seam.
//!
//! An `EventSource` delivers backend-pushed events for three kinds of
//! notification. Every registration hands back a `Subscription` guard
//! that owns the matching unsubscribe action.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::SyncResult;

/// Boxed, sendable future used at the collaborator seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Callback invoked with the raw payload of every delivered event.
pub type EventHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Unsubscribe action stored inside a `Subscription`.
pub type ReleaseFn = Box<dyn FnOnce() -> SyncResult<()> + Send>;

/// The categories of backend-pushed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MonitorStatusChanged,
    MonitoringStarted,
    MonitoringStopped,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::MonitorStatusChanged,
        EventKind::MonitoringStarted,
        EventKind::MonitoringStopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MonitorStatusChanged => "status-changed",
            EventKind::MonitoringStarted => "monitoring-started",
            EventKind::MonitoringStopped => "monitoring-stopped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source of status events.
///
/// Sources that register synchronously return a ready future.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> BoxFuture<'_, SyncResult<Subscription>>;
}

/// Guard for one registered listener.
///
/// `release` runs the unsubscribe action at most once. Dropping a guard
/// that was never released releases it and discards any error.
pub struct Subscription {
    kind: EventKind,
    release: Option<ReleaseFn>,
}

impl Subscription {
    pub fn new(kind: EventKind, release: impl FnOnce() -> SyncResult<()> + Send + 'static) -> Self {
        Self {
            kind,
            release: Some(Box::new(release)),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Run the unsubscribe action. Later calls are no-ops.
    pub fn release(&mut self) -> SyncResult<()> {
        match self.release.take() {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("released", &self.is_released())
            .finish()
    }
}
