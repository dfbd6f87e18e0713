//! Append-only in-memory request log
//!
//! Every completed request (including those short-circuited by the
//! pipeline) is appended here for test introspection. The log is
//! guarded by its own lock and reads hand out copies.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// A completed request as observed by the pipeline.
#[derive(Debug, Clone)]
pub struct RequestLogEntry {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub status: u16,
    pub response_headers: HashMap<String, String>,
    pub duration: Duration,
    pub completed_at: DateTime<Utc>,
}

/// Append-only request log.
#[derive(Debug, Default)]
pub struct RequestLog {
    entries: Mutex<Vec<RequestLogEntry>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: RequestLogEntry) {
        self.entries.lock().push(entry);
    }

    /// Copy of all recorded entries, oldest first.
    pub fn entries(&self) -> Vec<RequestLogEntry> {
        self.entries.lock().clone()
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, status: u16) -> RequestLogEntry {
        RequestLogEntry {
            method: "GET".to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            status,
            response_headers: HashMap::new(),
            duration: Duration::from_millis(12),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let log = RequestLog::new();
        log.append(entry("/a", 200));
        log.append(entry("/b", 404));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "/a");
        assert_eq!(entries[1].status, 404);
    }

    #[test]
    fn test_entries_returns_a_copy() {
        let log = RequestLog::new();
        log.append(entry("/a", 200));

        let mut copy = log.entries();
        copy.clear();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_clear() {
        let log = RequestLog::new();
        log.append(entry("/a", 200));
        log.clear();
        assert!(log.is_empty());
    }
}
