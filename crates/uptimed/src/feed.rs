//! JSON-lines event feed.
//!
//! Each non-blank line is one event:
//!
//! ```text
//! {"kind": "status-changed", "payload": {"siteIdentifier": "site1", ...}}
//! {"kind": "monitoring-stopped", "payload": {"activeMonitors": 0}}
//! ```
//!
//! Lines starting with `#` are comments. The payload is passed through
//! untouched; validating it is the manager's job.

use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::Value;

use uptime_sync::EventKind;

#[derive(Debug, Deserialize)]
struct RawEntry {
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// One event read from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    /// 1-based line number in the feed file.
    pub line: usize,
    pub kind: EventKind,
    pub payload: Value,
}

/// Parse one feed line. Blank lines and comments yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> anyhow::Result<Option<FeedEntry>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let raw: RawEntry =
        serde_json::from_str(trimmed).with_context(|| format!("line {line_no}: not a feed entry"))?;
    let Some(kind) = EventKind::parse(&raw.kind) else {
        bail!("line {line_no}: unknown event kind `{}`", raw.kind);
    };

    Ok(Some(FeedEntry {
        line: line_no,
        kind,
        payload: raw.payload,
    }))
}

pub fn parse_feed(content: &str) -> anyhow::Result<Vec<FeedEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if let Some(entry) = parse_line(idx + 1, line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

pub fn read_feed(path: &Path) -> anyhow::Result<Vec<FeedEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read event feed {}", path.display()))?;
    parse_feed(&content)
}
