//! Feed replay — wires store, bus, and manager together and pushes a
//! recorded event feed through them.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use uptime_core::{SiteList, StatusUpdate, UptimeConfig};
use uptime_events::EventBus;
use uptime_store::{MemorySiteStore, SnapshotSource};
use uptime_sync::{EventKind, SiteStore, StatusUpdateManager, SyncStats, validate_status_changed};

use crate::feed::{FeedEntry, read_feed};

/// Result of replaying a feed.
#[derive(Debug)]
pub struct ReplayReport {
    pub delivered: usize,
    pub undelivered: usize,
    pub stats: SyncStats,
    pub sites: SiteList,
}

/// Load the snapshot, subscribe a manager to a fresh bus, and publish
/// every feed entry in order.
pub async fn replay(config: &UptimeConfig, snapshot_path: &Path, events_path: &Path) -> anyhow::Result<ReplayReport> {
    let snapshot = SnapshotSource::new(snapshot_path);
    let entries = read_feed(events_path)?;

    let store = MemorySiteStore::new();
    let initial = snapshot
        .load()
        .with_context(|| format!("failed to load snapshot {}", snapshot_path.display()))?;
    store.set_sites(initial)?;
    info!(sites = store.len(), events = entries.len(), "replay starting");

    let bus = EventBus::new();
    let manager = StatusUpdateManager::new(
        Arc::new(bus.clone()),
        Arc::new(store.clone()),
        snapshot.resync_into(Arc::new(store.clone())),
    )
    .with_config(&config.sync)
    .with_callback(Arc::new(|update: &StatusUpdate| {
        info!(
            site = %update.site_identifier,
            monitor = %update.monitor_id,
            status = %update.status,
            previous = %update.previous_status,
            at = %update.timestamp,
            "monitor status updated"
        );
    }));
    manager.subscribe().await?;

    let mut delivered = 0;
    let mut undelivered = 0;
    for FeedEntry { line, kind, payload } in entries {
        if bus.publish(kind, payload).await == 0 {
            warn!(line, %kind, "no listener for event");
            undelivered += 1;
        } else {
            delivered += 1;
        }
    }

    manager.unsubscribe();
    let stats = manager.stats();
    info!(
        delivered,
        applied = stats.applied,
        resyncs = stats.resyncs,
        invalid = stats.invalid_payloads,
        "replay complete"
    );

    Ok(ReplayReport {
        delivered,
        undelivered,
        stats,
        sites: store.sites(),
    })
}

/// Validate every status-changed entry in a feed without applying it.
///
/// Returns one line of output per entry.
pub fn check(events_path: &Path) -> anyhow::Result<Vec<String>> {
    let entries = read_feed(events_path)?;
    Ok(entries
        .iter()
        .map(|entry| {
            let verdict = match entry.kind {
                EventKind::MonitorStatusChanged => match validate_status_changed(&entry.payload) {
                    Ok(_) => "ok".to_string(),
                    Err(e) => format!("invalid: {e}"),
                },
                _ => "ok".to_string(),
            };
            format!("line {} ({}): {verdict}", entry.line, entry.kind)
        })
        .collect())
}
