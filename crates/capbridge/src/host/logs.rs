//! Worker-tagged log buffer.
//!
//! Several sandboxed workers can share one [`LogBuffer`]. Each gets its own
//! [`WorkerLogSink`], which stamps every line with the worker's address and
//! name. The buffer can then be searched with [`LogBuffer::query`].

use std::sync::{Arc, Mutex};

use crate::capability::Severity;
use crate::error::HostError;

use super::{OutputSink, WorkerIdentity};

/// One buffered console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Address of the worker that logged the line.
    pub address: String,
    /// Name of the worker that logged the line.
    pub name: String,
    /// The message, with trailing whitespace removed.
    pub message: String,
    /// Stream the line was written to.
    pub severity: Severity,
}

/// Shared, append-only store of console output from many workers.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: Mutex<Vec<LogEntry>>,
}

impl LogBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that appends to this buffer on behalf of `worker`.
    pub fn sink(self: &Arc<Self>, worker: WorkerIdentity) -> WorkerLogSink {
        WorkerLogSink {
            buffer: Arc::clone(self),
            worker,
        }
    }

    /// Append one payload for `worker`.
    pub fn push(
        &self,
        worker: &WorkerIdentity,
        severity: Severity,
        payload: &[u8],
    ) -> Result<(), HostError> {
        let message = String::from_utf8_lossy(payload).trim_end().to_string();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| HostError::internal("log buffer lock poisoned"))?;
        entries.push(LogEntry {
            address: worker.address.clone(),
            name: worker.name.clone(),
            message,
            severity,
        });
        Ok(())
    }

    /// Every buffered entry, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries matching every term of `query`, oldest first.
    ///
    /// Terms are whitespace separated and case-insensitive. `addr:<part>`
    /// matches entries whose address contains `<part>`, `name:<part>` those
    /// whose worker name contains it. Any other term matches nothing. An
    /// empty query returns no entries.
    pub fn query(&self, query: &str) -> Vec<LogEntry> {
        let query = query.to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();
        if terms.is_empty() {
            return Vec::new();
        }

        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|entry| terms.iter().all(|term| term_matches(term, entry)))
            .cloned()
            .collect()
    }
}

fn term_matches(term: &str, entry: &LogEntry) -> bool {
    if let Some(part) = term.strip_prefix("addr:") {
        entry.address.to_lowercase().contains(part)
    } else if let Some(part) = term.strip_prefix("name:") {
        entry.name.to_lowercase().contains(part)
    } else {
        false
    }
}

/// [`OutputSink`] that appends to a [`LogBuffer`] as one worker.
#[derive(Debug, Clone)]
pub struct WorkerLogSink {
    buffer: Arc<LogBuffer>,
    worker: WorkerIdentity,
}

impl WorkerLogSink {
    /// The worker this sink logs as.
    pub fn worker(&self) -> &WorkerIdentity {
        &self.worker
    }
}

impl OutputSink for WorkerLogSink {
    fn write(&self, severity: Severity, payload: &[u8]) -> Result<(), HostError> {
        self.buffer.push(&self.worker, severity, payload)
    }
}
