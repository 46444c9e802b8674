//! Inbound event parsing.
//!
//! Payloads pushed by the backend are untrusted JSON. A status-changed
//! payload is only acted on after `validate_status_changed` has turned it
//! into a `StatusChangedEvent`; anything else is rejected as a whole and
//! never partially applied.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use uptime_core::{MonitorStatus, StatusHistory};

/// Why a status-changed payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidEvent {
    #[error("payload is not an object (found {found})")]
    NotAnObject { found: &'static str },

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be a {expected} (found {found})")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field `{field}` has unknown status `{value}`")]
    UnknownStatus { field: &'static str, value: String },
}

/// A validated monitor status change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChangedEvent {
    pub site_identifier: String,
    pub monitor_id: String,
    pub status: MonitorStatus,
    pub previous_status: MonitorStatus,
    pub monitor: Option<MonitorSnapshot>,
    pub site: Option<SiteSnapshot>,
    pub timestamp: Option<EventTimestamp>,
    pub correlation_id: Option<String>,
}

/// Partial monitor state carried by an event. Absent fields are left
/// untouched when patching.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    #[serde(rename = "type")]
    pub monitor_type: Option<String>,
    pub monitoring: Option<bool>,
    pub check_interval: Option<u64>,
    pub timeout: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub response_time: Option<u64>,
    pub last_checked: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub history: Option<Vec<StatusHistory>>,
}

/// Partial site state carried by an event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSnapshot {
    pub name: Option<String>,
    pub monitoring: Option<bool>,
}

/// Event timestamp as sent: epoch milliseconds or preformatted text.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTimestamp {
    Millis(i64),
    Text(String),
}

impl EventTimestamp {
    /// Normalized RFC 3339 form with millisecond precision.
    ///
    /// Values that do not name a representable instant fall back to the
    /// current time.
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// The instant this timestamp names, when it can be read as one.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            EventTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Counters carried by monitoring-started/stopped notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleCounters {
    pub site_count: Option<u64>,
    pub monitor_count: Option<u64>,
    pub active_monitors: Option<u64>,
}

/// Validate a raw status-changed payload.
///
/// Required: `siteIdentifier` and `monitorId` strings, `status` and
/// `previousStatus` naming a known status. Optional fields that fail to
/// parse are dropped rather than failing the event.
pub fn validate_status_changed(payload: &Value) -> Result<StatusChangedEvent, InvalidEvent> {
    let obj = payload.as_object().ok_or(InvalidEvent::NotAnObject {
        found: json_kind(payload),
    })?;

    let site_identifier = required_str(obj, "siteIdentifier")?.to_string();
    let monitor_id = required_str(obj, "monitorId")?.to_string();
    let status = required_status(obj, "status")?;
    let previous_status = required_status(obj, "previousStatus")?;

    Ok(StatusChangedEvent {
        site_identifier,
        monitor_id,
        status,
        previous_status,
        monitor: optional_object(obj, "monitor"),
        site: optional_object(obj, "site"),
        timestamp: match obj.get("timestamp") {
            Some(Value::Number(n)) => n.as_i64().map(EventTimestamp::Millis),
            Some(Value::String(s)) => Some(EventTimestamp::Text(s.clone())),
            _ => None,
        },
        correlation_id: obj
            .get("correlationId")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Read whatever counters a lifecycle payload carries. Never fails.
pub fn lifecycle_counters(payload: &Value) -> LifecycleCounters {
    let counter = |key: &str| payload.get(key).and_then(Value::as_u64);
    LifecycleCounters {
        site_count: counter("siteCount"),
        monitor_count: counter("monitorCount"),
        active_monitors: counter("activeMonitors"),
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, InvalidEvent> {
    match obj.get(field) {
        None => Err(InvalidEvent::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(InvalidEvent::WrongType {
            field,
            expected: "string",
            found: json_kind(other),
        }),
    }
}

fn required_status(obj: &Map<String, Value>, field: &'static str) -> Result<MonitorStatus, InvalidEvent> {
    let raw = required_str(obj, field)?;
    raw.parse().map_err(|_| InvalidEvent::UnknownStatus {
        field,
        value: raw.to_string(),
    })
}

fn optional_object<T: for<'de> Deserialize<'de>>(obj: &Map<String, Value>, field: &str) -> Option<T> {
    match obj.get(field) {
        Some(value @ Value::Object(_)) => T::deserialize(value).ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
