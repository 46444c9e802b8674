//! Status update manager — keeps the client-held site tree in step with
//! backend-pushed monitor events.
//!
//! Each status-changed event is validated and applied as a targeted
//! patch to one monitor. When the payload is malformed, refers to a site
//! or monitor the local collection does not know, or the patch cannot be
//! stored, the manager falls back to a full resync instead.
//!
//! Concurrent events are processed independently. Two updates racing on
//! the same monitor resolve last-write-wins at the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use uptime_core::config::SyncConfig;
use uptime_core::{LifecyclePolicy, StatusUpdate, find_site};

use crate::error::SyncResult;
use crate::event::{StatusChangedEvent, lifecycle_counters, validate_status_changed};
use crate::fallback::{Fallback, FallbackReason, notify_guarded, resync_quietly, with_fallback};
use crate::patch::{self, Locate};
use crate::store::{ResyncFn, SiteStore};
use crate::subscription::{EventHandler, EventKind, EventSource, Subscription};

/// Callback invoked after an incremental update has been applied.
pub type UpdateCallback = Arc<dyn Fn(&StatusUpdate) + Send + Sync>;

/// Predicate consulted on every event to decide whether to emit
/// development logs.
pub type DevModeFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// What a status-changed event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChangeOutcome {
    /// The patch was stored. `notified` is true when the update callback
    /// ran to completion.
    Applied { notified: bool },
    /// The incremental path was abandoned for a full resync.
    FellBack(Fallback),
}

/// What a monitoring-started/stopped event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Logged,
    Resynced { ok: bool },
}

/// Running totals for a manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub applied: u64,
    pub notified: u64,
    pub invalid_payloads: u64,
    pub resyncs: u64,
    pub failed_resyncs: u64,
    pub lifecycle_events: u64,
}

#[derive(Default)]
struct Counters {
    applied: AtomicU64,
    notified: AtomicU64,
    invalid_payloads: AtomicU64,
    resyncs: AtomicU64,
    failed_resyncs: AtomicU64,
    lifecycle_events: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_resync(&self, ok: bool) {
        Self::bump(&self.resyncs);
        if !ok {
            Self::bump(&self.failed_resyncs);
        }
    }

    fn snapshot(&self) -> SyncStats {
        SyncStats {
            applied: self.applied.load(Ordering::Relaxed),
            notified: self.notified.load(Ordering::Relaxed),
            invalid_payloads: self.invalid_payloads.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            failed_resyncs: self.failed_resyncs.load(Ordering::Relaxed),
            lifecycle_events: self.lifecycle_events.load(Ordering::Relaxed),
        }
    }
}

/// Event handling state shared with every registered listener.
#[derive(Clone)]
struct Handlers {
    store: Arc<dyn SiteStore>,
    full_resync: ResyncFn,
    on_update: Option<UpdateCallback>,
    is_development: DevModeFn,
    lifecycle_policy: LifecyclePolicy,
    counters: Arc<Counters>,
}

enum SubscriptionState {
    Unsubscribed,
    Subscribed(Vec<Subscription>),
}

/// Applies backend status events to a site store.
pub struct StatusUpdateManager {
    source: Arc<dyn EventSource>,
    handlers: Handlers,
    state: Mutex<SubscriptionState>,
}

impl StatusUpdateManager {
    /// Create a manager over the given collaborators.
    ///
    /// Development mode defaults to `uptime_core::is_development` and the
    /// lifecycle policy to `DEFAULT_LIFECYCLE_POLICY`.
    pub fn new(source: Arc<dyn EventSource>, store: Arc<dyn SiteStore>, full_resync: ResyncFn) -> Self {
        Self {
            source,
            handlers: Handlers {
                store,
                full_resync,
                on_update: None,
                is_development: Arc::new(uptime_core::is_development),
                lifecycle_policy: LifecyclePolicy::default(),
                counters: Arc::new(Counters::default()),
            },
            state: Mutex::new(SubscriptionState::Unsubscribed),
        }
    }

    /// Set a callback for applied incremental updates.
    pub fn with_callback(mut self, callback: UpdateCallback) -> Self {
        self.handlers.on_update = Some(callback);
        self
    }

    /// Replace the development-mode predicate.
    pub fn with_dev_mode(mut self, is_development: DevModeFn) -> Self {
        self.handlers.is_development = is_development;
        self
    }

    /// Choose how monitoring-started/stopped events are handled.
    pub fn with_lifecycle_policy(mut self, policy: LifecyclePolicy) -> Self {
        self.handlers.lifecycle_policy = policy;
        self
    }

    /// Apply the `[sync]` section of `uptime.toml`.
    pub fn with_config(mut self, config: &SyncConfig) -> Self {
        self.handlers.lifecycle_policy = config.lifecycle_policy;
        if let Some(development) = config.development {
            self.handlers.is_development = Arc::new(move || development);
        }
        self
    }

    /// Access the active lifecycle policy.
    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        self.handlers.lifecycle_policy
    }

    // ── Subscription lifecycle ─────────────────────────────────────

    /// Register listeners for all three event kinds.
    ///
    /// Any existing registration is released first, so at most one set
    /// of listeners is live. If a registration fails, the ones already
    /// acquired are released and the manager stays unsubscribed.
    pub async fn subscribe(&self) -> SyncResult<()> {
        self.unsubscribe();

        let mut subscriptions = Vec::with_capacity(EventKind::ALL.len());
        for kind in EventKind::ALL {
            match self.source.subscribe(kind, self.listener(kind)).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => {
                    warn!(%kind, error = %e, "event subscription failed");
                    release_all(&mut subscriptions);
                    return Err(e);
                }
            }
        }

        *self.lock_state() = SubscriptionState::Subscribed(subscriptions);
        info!("status update manager subscribed");
        Ok(())
    }

    /// Release every listener. A no-op when not subscribed.
    ///
    /// All guards are released even when some of them fail; failures are
    /// logged and never returned.
    pub fn unsubscribe(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), SubscriptionState::Unsubscribed);
        if let SubscriptionState::Subscribed(mut subscriptions) = previous {
            release_all(&mut subscriptions);
            info!("status update manager unsubscribed");
        }
    }

    /// Whether listeners are currently registered.
    pub fn is_subscribed(&self) -> bool {
        matches!(*self.lock_state(), SubscriptionState::Subscribed(_))
    }

    /// Snapshot of the running counters.
    pub fn stats(&self) -> SyncStats {
        self.handlers.counters.snapshot()
    }

    // ── Event handlers ─────────────────────────────────────────────

    /// Handle a raw monitor status-changed payload.
    pub async fn handle_status_changed(&self, payload: &Value) -> StatusChangeOutcome {
        self.handlers.status_changed(payload).await
    }

    /// Handle a monitoring-started notification.
    pub async fn handle_monitoring_started(&self, payload: &Value) -> LifecycleOutcome {
        self.handlers
            .lifecycle(EventKind::MonitoringStarted, payload)
            .await
    }

    /// Handle a monitoring-stopped notification.
    pub async fn handle_monitoring_stopped(&self, payload: &Value) -> LifecycleOutcome {
        self.handlers
            .lifecycle(EventKind::MonitoringStopped, payload)
            .await
    }

    fn listener(&self, kind: EventKind) -> EventHandler {
        let handlers = self.handlers.clone();
        Arc::new(move |payload: Value| {
            let handlers = handlers.clone();
            Box::pin(async move {
                handlers.dispatch(kind, &payload).await;
            })
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, SubscriptionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn release_all(subscriptions: &mut [Subscription]) {
    for subscription in subscriptions.iter_mut() {
        if let Err(e) = subscription.release() {
            warn!(kind = %subscription.kind(), error = %e, "failed to release subscription");
        }
    }
}

impl Handlers {
    async fn dispatch(&self, kind: EventKind, payload: &Value) {
        match kind {
            EventKind::MonitorStatusChanged => {
                self.status_changed(payload).await;
            }
            EventKind::MonitoringStarted | EventKind::MonitoringStopped => {
                self.lifecycle(kind, payload).await;
            }
        }
    }

    async fn status_changed(&self, payload: &Value) -> StatusChangeOutcome {
        let dev = (self.is_development)();

        let result = with_fallback(&self.full_resync, || {
            let event = validate_status_changed(payload).map_err(|invalid| {
                Counters::bump(&self.counters.invalid_payloads);
                if dev {
                    warn!(reason = %invalid, %payload, "invalid monitor status changed event data");
                }
                FallbackReason::InvalidPayload(invalid)
            })?;
            self.apply_incremental(&event, dev)
        })
        .await;

        match result {
            Ok(notified) => StatusChangeOutcome::Applied { notified },
            Err(fallback) => {
                self.counters.record_resync(fallback.resynced);
                if dev {
                    debug!(reason = %fallback.reason, resynced = fallback.resynced, "fell back to full resync");
                }
                StatusChangeOutcome::FellBack(fallback)
            }
        }
    }

    /// Patch the target monitor, store the result, and notify.
    ///
    /// Returns whether the update callback ran to completion.
    fn apply_incremental(&self, event: &StatusChangedEvent, dev: bool) -> Result<bool, FallbackReason> {
        let sites = self.store.sites();
        let (site_idx, monitor_idx) = match patch::locate(&sites, event) {
            Locate::Found { site, monitor } => (site, monitor),
            Locate::MissingSite => {
                if dev {
                    debug!(site = %event.site_identifier, "site not found for status update");
                }
                return Err(FallbackReason::MissingSite {
                    site: event.site_identifier.clone(),
                });
            }
            Locate::MissingMonitor => {
                if dev {
                    debug!(
                        site = %event.site_identifier,
                        monitor = %event.monitor_id,
                        "monitor not found for status update"
                    );
                }
                return Err(FallbackReason::MissingMonitor {
                    site: event.site_identifier.clone(),
                    monitor: event.monitor_id.clone(),
                });
            }
        };

        let next = patch::apply(&sites, site_idx, monitor_idx, event);
        let patched_monitor = next[site_idx].monitors[monitor_idx].clone();
        self.store
            .set_sites(next)
            .map_err(|e| FallbackReason::PatchFailed(e.to_string()))?;
        Counters::bump(&self.counters.applied);

        if dev {
            debug!(
                site = %event.site_identifier,
                monitor = %event.monitor_id,
                status = %event.status,
                previous = %event.previous_status,
                correlation_id = event.correlation_id.as_deref().unwrap_or("-"),
                "applied incremental status update"
            );
        }

        let current = self.store.sites();
        let Some(site) = find_site(&current, &event.site_identifier).cloned() else {
            return Ok(false);
        };
        let Some(callback) = &self.on_update else {
            return Ok(false);
        };

        let monitor = site
            .monitor(&event.monitor_id)
            .cloned()
            .unwrap_or(patched_monitor);
        let update = StatusUpdate {
            site_identifier: event.site_identifier.clone(),
            monitor_id: event.monitor_id.clone(),
            status: event.status,
            previous_status: event.previous_status,
            timestamp: event
                .timestamp
                .as_ref()
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            monitor,
            site,
        };

        let completed = notify_guarded(callback, &update);
        if completed {
            Counters::bump(&self.counters.notified);
        } else if dev {
            warn!(site = %update.site_identifier, monitor = %update.monitor_id, "status update callback panicked");
        }
        Ok(completed)
    }

    async fn lifecycle(&self, kind: EventKind, payload: &Value) -> LifecycleOutcome {
        Counters::bump(&self.counters.lifecycle_events);

        if (self.is_development)() {
            let counters = lifecycle_counters(payload);
            let phase = match kind {
                EventKind::MonitoringStopped => "stopped",
                _ => "started",
            };
            debug!(
                phase,
                site_count = ?counters.site_count,
                monitor_count = ?counters.monitor_count,
                active_monitors = ?counters.active_monitors,
                "monitoring lifecycle event"
            );
        }

        match self.lifecycle_policy {
            LifecyclePolicy::LogOnly => LifecycleOutcome::Logged,
            LifecyclePolicy::Resync => {
                let ok = resync_quietly(&self.full_resync).await;
                self.counters.record_resync(ok);
                LifecycleOutcome::Resynced { ok }
            }
        }
    }
}
