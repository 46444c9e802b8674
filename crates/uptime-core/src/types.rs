//! Shared domain types for the uptime site/monitor tree.
//!
//! Sites and monitors are held behind `Arc` so that an incremental update
//! can rebuild only the path to the changed monitor. Everything else in a
//! new `SiteList` points at the same allocations as the previous one, and
//! consumers can skip work with `Arc::ptr_eq`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a site.
pub type SiteIdentifier = String;

/// Identifier for a monitor, unique within its site.
pub type MonitorId = String;

/// The client-held collection of sites.
pub type SiteList = Vec<Arc<Site>>;

// ── Status ────────────────────────────────────────────────────────

/// Result of the most recent check for a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Pending,
    Unknown,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Pending => "pending",
            MonitorStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            "pending" => Ok(MonitorStatus::Pending),
            "unknown" => Ok(MonitorStatus::Unknown),
            other => Err(format!("unknown monitor status: {other}")),
        }
    }
}

// ── Monitor ───────────────────────────────────────────────────────

/// One past check sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistory {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub status: MonitorStatus,
    /// Response time in milliseconds.
    pub response_time: u64,
}

/// A single check configuration and its latest observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: MonitorId,
    /// Probe kind: "http", "port", etc.
    #[serde(rename = "type")]
    pub monitor_type: String,
    pub status: MonitorStatus,
    /// Whether checks are currently scheduled for this monitor.
    pub monitoring: bool,
    /// Check interval in milliseconds.
    pub check_interval: u64,
    /// Per-check timeout in milliseconds.
    pub timeout: u64,
    pub retry_attempts: u32,
    /// Last measured response time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Oldest first.
    #[serde(default)]
    pub history: Vec<StatusHistory>,
}

impl Monitor {
    /// Timestamp of the newest history sample, if any.
    pub fn latest_sample_at(&self) -> Option<i64> {
        self.history.iter().map(|h| h.timestamp).max()
    }
}

// ── Site ──────────────────────────────────────────────────────────

/// A monitored target owning one or more monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub identifier: SiteIdentifier,
    pub name: String,
    pub monitoring: bool,
    #[serde(default)]
    pub monitors: Vec<Arc<Monitor>>,
}

impl Site {
    /// Find a monitor by id.
    pub fn monitor(&self, monitor_id: &str) -> Option<&Arc<Monitor>> {
        self.monitors.iter().find(|m| m.id == monitor_id)
    }
}

/// Find a site by identifier in a collection.
pub fn find_site<'a>(sites: &'a [Arc<Site>], identifier: &str) -> Option<&'a Arc<Site>> {
    sites.iter().find(|s| s.identifier == identifier)
}

// ── Outbound update ───────────────────────────────────────────────

/// Normalized record describing an applied incremental update.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub site_identifier: SiteIdentifier,
    pub monitor_id: MonitorId,
    pub status: MonitorStatus,
    pub previous_status: MonitorStatus,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub monitor: Arc<Monitor>,
    pub site: Arc<Site>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            MonitorStatus::Up,
            MonitorStatus::Down,
            MonitorStatus::Pending,
            MonitorStatus::Unknown,
        ] {
            assert_eq!(status.as_str().parse::<MonitorStatus>().unwrap(), status);
        }
        assert!("degraded".parse::<MonitorStatus>().is_err());
        assert!("UP".parse::<MonitorStatus>().is_err());
    }

    #[test]
    fn monitor_deserializes_wire_names() {
        let json = r#"{
            "id": "m1",
            "type": "http",
            "status": "up",
            "monitoring": true,
            "checkInterval": 60000,
            "timeout": 5000,
            "retryAttempts": 3,
            "responseTime": 120,
            "url": "https://example.com",
            "history": [{"timestamp": 1000, "status": "up", "responseTime": 120}]
        }"#;
        let monitor: Monitor = serde_json::from_str(json).unwrap();
        assert_eq!(monitor.monitor_type, "http");
        assert_eq!(monitor.check_interval, 60_000);
        assert_eq!(monitor.response_time, Some(120));
        assert_eq!(monitor.history.len(), 1);
        assert_eq!(monitor.latest_sample_at(), Some(1000));
        assert!(monitor.last_checked.is_none());
    }

    #[test]
    fn site_lookup_by_identifier() {
        let site = Arc::new(Site {
            identifier: "site1".to_string(),
            name: "Site One".to_string(),
            monitoring: true,
            monitors: vec![],
        });
        let sites = vec![site.clone()];
        assert!(Arc::ptr_eq(find_site(&sites, "site1").unwrap(), &site));
        assert!(find_site(&sites, "site2").is_none());
        assert!(site.monitor("m1").is_none());
    }
}
