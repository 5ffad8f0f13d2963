//! # System Log
//!
//! Append-only, timestamped record of every observable scheduler transition.
//! Entries are kept in memory for later inspection (tests assert on them)
//! and mirrored to `tracing` for live output.
//!
//! A `SystemLog` is a cheap handle: clones share the same entry list. It is
//! passed to the scheduler explicitly, so independent schedulers can keep
//! independent logs.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Shared, thread-safe diagnostic log.
#[derive(Debug, Clone, Default)]
pub struct SystemLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl SystemLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a state-transition entry.
    pub fn record(&self, description: impl Into<String>) {
        let description = description.into();
        tracing::debug!(target: "rmsched", "{description}");
        self.push(description);
    }

    /// Append a lifecycle entry (scheduler start/stop).
    pub fn notice(&self, description: impl Into<String>) {
        let description = description.into();
        tracing::info!(target: "rmsched", "{description}");
        self.push(description);
    }

    /// Append a rejected-request entry, prefixed with `ERROR: `.
    pub fn error(&self, description: impl Into<String>) {
        let description = format!("ERROR: {}", description.into());
        tracing::warn!(target: "rmsched", "{description}");
        self.push(description);
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Whether any entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().iter().any(|entry| entry.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, description: String) {
        let entry = format!("[{}] {}", timestamp(), description);
        self.entries.lock().push(entry);
    }
}

/// Wall-clock time as `seconds.millis` since the Unix epoch.
fn timestamp() -> String {
    // A clock before 1970 is reported as zero rather than failing the log call.
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}", now.as_secs(), now.subsec_millis())
}
