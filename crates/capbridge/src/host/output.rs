//! Output sinks behind `op_log_stdout` and `op_log_stderr`.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::capability::{OutputRecord, Severity};
use crate::error::HostError;

use super::WorkerIdentity;

/// Destination for console output leaving the sandbox.
pub trait OutputSink: Send + Sync {
    /// Accept one rendered, encoded log payload.
    ///
    /// A payload that could not be delivered is an error; the log operation
    /// reports it to the console caller.
    fn write(&self, severity: Severity, payload: &[u8]) -> Result<(), HostError>;
}

/// Sink that records every payload it receives.
#[derive(Debug, Default)]
pub struct CaptureSink {
    records: Mutex<Vec<OutputRecord>>,
}

impl CaptureSink {
    /// Create an empty capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records received so far, in arrival order.
    pub fn records(&self) -> Vec<OutputRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Concatenated normal-severity payloads.
    pub fn stdout(&self) -> Vec<u8> {
        self.collect(Severity::Normal)
    }

    /// Concatenated error-severity payloads.
    pub fn stderr(&self) -> Vec<u8> {
        self.collect(Severity::Error)
    }

    fn collect(&self, severity: Severity) -> Vec<u8> {
        self.records()
            .into_iter()
            .filter(|r| r.severity == severity)
            .flat_map(|r| r.payload)
            .collect()
    }
}

impl OutputSink for CaptureSink {
    fn write(&self, severity: Severity, payload: &[u8]) -> Result<(), HostError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| HostError::internal("capture sink lock poisoned"))?;
        records.push(OutputRecord::new(severity, payload.to_vec()));
        Ok(())
    }
}

/// Sink that writes to the process's stdout and stderr.
///
/// Each payload becomes one line. A tracing event tagged with the worker
/// identity is emitted alongside, so logs from several sandboxes can be
/// told apart.
#[derive(Debug, Clone, Default)]
pub struct StdioSink {
    worker: WorkerIdentity,
}

impl StdioSink {
    /// Create a sink for the given worker.
    pub fn new(worker: WorkerIdentity) -> Self {
        Self { worker }
    }
}

impl OutputSink for StdioSink {
    fn write(&self, severity: Severity, payload: &[u8]) -> Result<(), HostError> {
        let text = String::from_utf8_lossy(payload);
        let line = text.trim_end();
        match severity {
            Severity::Normal => {
                tracing::debug!(
                    worker = %self.worker.name,
                    address = %self.worker.address,
                    "{line}"
                );
                write_line(&mut io::stdout().lock(), line, "stdout")
            }
            Severity::Error => {
                tracing::debug!(
                    worker = %self.worker.name,
                    address = %self.worker.address,
                    severity = "error",
                    "{line}"
                );
                write_line(&mut io::stderr().lock(), line, "stderr")
            }
        }
    }
}

fn write_line(out: &mut impl Write, line: &str, stream: &str) -> Result<(), HostError> {
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|e| HostError::unavailable(format!("failed to write to {stream}: {e}")))
}
