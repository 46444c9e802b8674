//! Suppress-and-fallback policy.
//!
//! Every failure inside an event handler ends in one of two places: a
//! full resync whose own failure is discarded, or a guarded callback
//! whose panic is discarded. Both live here.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures_util::FutureExt;
use tracing::warn;
use uptime_core::StatusUpdate;

use crate::event::InvalidEvent;
use crate::manager::UpdateCallback;
use crate::store::ResyncFn;

/// Why the manager fell back to a full resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    InvalidPayload(InvalidEvent),
    MissingSite { site: String },
    MissingMonitor { site: String, monitor: String },
    PatchFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::InvalidPayload(e) => write!(f, "invalid payload: {e}"),
            FallbackReason::MissingSite { site } => write!(f, "site {site} not found"),
            FallbackReason::MissingMonitor { site, monitor } => {
                write!(f, "monitor {monitor} not found in site {site}")
            }
            FallbackReason::PatchFailed(e) => write!(f, "patch failed: {e}"),
        }
    }
}

/// Result of falling back to a full resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub reason: FallbackReason,
    /// Whether the resync itself completed.
    pub resynced: bool,
}

/// Run `attempt`; if it fails or panics, resync instead.
///
/// Nothing escapes: the resync's own error is discarded and reported
/// only through `Fallback::resynced`.
pub async fn with_fallback<T>(
    resync: &ResyncFn,
    attempt: impl FnOnce() -> Result<T, FallbackReason>,
) -> Result<T, Fallback> {
    let reason = match catch_unwind(AssertUnwindSafe(attempt)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(reason)) => reason,
        Err(_) => FallbackReason::PatchFailed("incremental update panicked".to_string()),
    };
    let resynced = resync_quietly(resync).await;
    Err(Fallback { reason, resynced })
}

/// Run a full resync and discard its outcome.
///
/// Returns whether the resync succeeded. A failed or panicking resync
/// leaves the collection as it was.
pub async fn resync_quietly(resync: &ResyncFn) -> bool {
    let future = match catch_unwind(AssertUnwindSafe(|| resync())) {
        Ok(future) => future,
        Err(_) => {
            warn!("full resync panicked before starting");
            return false;
        }
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result.is_ok(),
        Err(_) => {
            warn!("full resync panicked");
            false
        }
    }
}

/// Invoke the update callback, containing any panic it raises.
///
/// Returns whether the callback completed normally.
pub fn notify_guarded(callback: &UpdateCallback, update: &StatusUpdate) -> bool {
    catch_unwind(AssertUnwindSafe(|| callback(update))).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uptime_core::{Monitor, MonitorStatus, Site};

    fn make_update() -> StatusUpdate {
        let monitor = Arc::new(Monitor {
            id: "m1".to_string(),
            monitor_type: "port".to_string(),
            status: MonitorStatus::Down,
            monitoring: true,
            check_interval: 30_000,
            timeout: 1_000,
            retry_attempts: 0,
            response_time: None,
            last_checked: None,
            url: None,
            host: Some("db.internal".to_string()),
            port: Some(5432),
            history: vec![],
        });
        let site = Arc::new(Site {
            identifier: "site1".to_string(),
            name: "Database".to_string(),
            monitoring: true,
            monitors: vec![monitor.clone()],
        });
        StatusUpdate {
            site_identifier: "site1".to_string(),
            monitor_id: "m1".to_string(),
            status: MonitorStatus::Down,
            previous_status: MonitorStatus::Up,
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            monitor,
            site,
        }
    }

    #[tokio::test]
    async fn resync_failure_is_swallowed() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let resync: ResyncFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(SyncError::Resync("backend unreachable".to_string())) })
        });

        assert!(!resync_quietly(&resync).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    async fn crashing_resync() -> crate::error::SyncResult<()> {
        panic!("backend bridge crashed")
    }

    #[tokio::test]
    async fn resync_panic_is_swallowed() {
        let resync: ResyncFn = Arc::new(|| Box::pin(crashing_resync()));
        assert!(!resync_quietly(&resync).await);

        let eager: ResyncFn = Arc::new(|| panic!("resync could not be built"));
        assert!(!resync_quietly(&eager).await);

        let result = with_fallback(&resync, || -> Result<(), _> {
            Err(FallbackReason::PatchFailed("rejected".to_string()))
        })
        .await;
        assert_eq!(
            result,
            Err(Fallback {
                reason: FallbackReason::PatchFailed("rejected".to_string()),
                resynced: false,
            })
        );
    }

    #[tokio::test]
    async fn with_fallback_skips_resync_on_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let resync: ResyncFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        });

        let result = with_fallback(&resync, || Ok::<_, FallbackReason>(7)).await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn with_fallback_resyncs_on_error_and_panic() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let resync: ResyncFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        });

        let result = with_fallback(&resync, || -> Result<(), _> {
            Err(FallbackReason::MissingSite {
                site: "site1".to_string(),
            })
        })
        .await;
        assert_eq!(
            result,
            Err(Fallback {
                reason: FallbackReason::MissingSite {
                    site: "site1".to_string()
                },
                resynced: true,
            })
        );

        let result = with_fallback(&resync, || -> Result<(), FallbackReason> {
            panic!("store poisoned")
        })
        .await;
        assert!(matches!(
            result,
            Err(Fallback {
                reason: FallbackReason::PatchFailed(_),
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resync_success_is_reported() {
        let resync: ResyncFn = Arc::new(|| Box::pin(async { Ok(()) }));
        assert!(resync_quietly(&resync).await);
    }

    #[test]
    fn panicking_callback_is_contained() {
        let callback: UpdateCallback = Arc::new(|_update: &StatusUpdate| panic!("renderer exploded"));
        assert!(!notify_guarded(&callback, &make_update()));
    }

    #[test]
    fn callback_receives_update() {
        let seen = Arc::new(AtomicU32::new(0));
        let counter = seen.clone();
        let callback: UpdateCallback = Arc::new(move |update: &StatusUpdate| {
            assert_eq!(update.monitor_id, "m1");
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(notify_guarded(&callback, &make_update()));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reasons_render_readably() {
        let reason = FallbackReason::MissingMonitor {
            site: "site1".to_string(),
            monitor: "m9".to_string(),
        };
        assert_eq!(reason.to_string(), "monitor m9 not found in site site1");
        assert_eq!(
            FallbackReason::PatchFailed("disk full".to_string()).to_string(),
            "patch failed: disk full"
        );
    }
}
