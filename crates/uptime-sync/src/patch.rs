//! Incremental patch application.
//!
//! Produces a new `SiteList` in which exactly one monitor differs from
//! the input. Unchanged sites and monitors are shared with the input
//! collection, so `Arc::ptr_eq` holds for everything outside the path to
//! the patched monitor.

use std::sync::Arc;

use uptime_core::{Monitor, Site, SiteList, StatusHistory};

use crate::event::StatusChangedEvent;

/// Where the target of an event lives in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locate {
    Found { site: usize, monitor: usize },
    MissingSite,
    MissingMonitor,
}

/// Find the site and monitor an event refers to.
pub fn locate(sites: &[Arc<Site>], event: &StatusChangedEvent) -> Locate {
    let Some(site) = sites
        .iter()
        .position(|s| s.identifier == event.site_identifier)
    else {
        return Locate::MissingSite;
    };
    match sites[site]
        .monitors
        .iter()
        .position(|m| m.id == event.monitor_id)
    {
        Some(monitor) => Locate::Found { site, monitor },
        None => Locate::MissingMonitor,
    }
}

/// Build the collection that results from applying `event` to the
/// monitor at `(site, monitor)`. A site snapshot on the event updates the
/// owning site's name and monitoring flag.
///
/// Indices must come from `locate` on the same collection.
pub fn apply(sites: &[Arc<Site>], site: usize, monitor: usize, event: &StatusChangedEvent) -> SiteList {
    let target_site = &sites[site];
    let patched_monitor = Arc::new(patch_monitor(&target_site.monitors[monitor], event));

    let mut monitors = target_site.monitors.clone();
    monitors[monitor] = patched_monitor;

    let mut patched_site = Site {
        monitors,
        ..Site::clone(target_site)
    };
    if let Some(snapshot) = &event.site {
        if let Some(name) = &snapshot.name {
            patched_site.name = name.clone();
        }
        if let Some(monitoring) = snapshot.monitoring {
            patched_site.monitoring = monitoring;
        }
    }

    let mut next = sites.to_vec();
    next[site] = Arc::new(patched_site);
    next
}

/// Overwrite a monitor's fields from an event.
///
/// Status always comes from the event. Other fields change only when
/// the snapshot carries them. History is append-only.
pub fn patch_monitor(current: &Monitor, event: &StatusChangedEvent) -> Monitor {
    let mut next = current.clone();
    next.status = event.status;

    if let Some(snapshot) = &event.monitor {
        if let Some(monitor_type) = &snapshot.monitor_type {
            next.monitor_type = monitor_type.clone();
        }
        if let Some(monitoring) = snapshot.monitoring {
            next.monitoring = monitoring;
        }
        if let Some(check_interval) = snapshot.check_interval {
            next.check_interval = check_interval;
        }
        if let Some(timeout) = snapshot.timeout {
            next.timeout = timeout;
        }
        if let Some(retry_attempts) = snapshot.retry_attempts {
            next.retry_attempts = retry_attempts;
        }
        if snapshot.response_time.is_some() {
            next.response_time = snapshot.response_time;
        }
        if snapshot.last_checked.is_some() {
            next.last_checked = snapshot.last_checked;
        }
        if snapshot.url.is_some() {
            next.url = snapshot.url.clone();
        }
        if snapshot.host.is_some() {
            next.host = snapshot.host.clone();
        }
        if snapshot.port.is_some() {
            next.port = snapshot.port;
        }
        if let Some(history) = &snapshot.history {
            next.history = merge_history(current, history);
        }
    }

    let snapshot_checked = event
        .monitor
        .as_ref()
        .is_some_and(|s| s.last_checked.is_some());
    if !snapshot_checked {
        if let Some(checked) = event.timestamp.as_ref().and_then(|ts| ts.to_datetime()) {
            next.last_checked = Some(checked);
        }
    }

    next
}

/// Append the incoming samples that are newer than everything `current`
/// has stored.
///
/// An empty incoming history leaves the stored one untouched.
pub fn merge_history(current: &Monitor, incoming: &[StatusHistory]) -> Vec<StatusHistory> {
    let newest = current.latest_sample_at();
    let mut fresh: Vec<StatusHistory> = incoming
        .iter()
        .filter(|h| newest.is_none_or(|n| h.timestamp > n))
        .cloned()
        .collect();
    fresh.sort_by_key(|h| h.timestamp);
    fresh.dedup_by_key(|h| h.timestamp);

    let mut merged = current.history.clone();
    merged.extend(fresh);
    merged
}
