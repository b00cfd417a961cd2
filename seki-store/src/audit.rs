//! Audit sinks for access-gate outcomes
//!
//! Every gated `read`/`write` emits one [`AccessEvent`] to the owning
//! store's sink (the null sink unless configured). Sinks are trait-based so
//! host applications can route events to their preferred destination.

use chrono::Utc;
use seki_types::AccessMode;
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

/// Outcome of a permission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    Allowed,
    Denied,
}

/// One gate decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessEvent {
    /// Event time, RFC 3339.
    pub timestamp: String,
    /// Kind tag of the store that gated the access.
    pub kind: String,
    /// Full path as passed by the caller.
    pub path: String,
    /// First path segment, the key the gate judged.
    pub key: String,
    /// Requested access mode.
    pub mode: AccessMode,
    /// Gate decision.
    pub outcome: AccessOutcome,
}

impl AccessEvent {
    /// Create an event stamped with the current time.
    pub fn new(
        kind: impl Into<String>,
        path: impl Into<String>,
        key: impl Into<String>,
        mode: AccessMode,
        outcome: AccessOutcome,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind: kind.into(),
            path: path.into(),
            key: key.into(),
            mode,
            outcome,
        }
    }
}

/// Error type for audit sink operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to write audit log: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("failed to serialize access event: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Trait for access-event sinks.
///
/// Recording failures never fail the store operation that produced the
/// event; the store logs them and carries on.
pub trait AuditSink: Send + Sync {
    /// Record one access event.
    fn record(&self, event: AccessEvent) -> Result<(), AuditError>;

    /// Flush any buffered events.
    fn flush(&self) -> Result<(), AuditError>;

    /// Check if the sink is healthy/available.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Sharing a sink between the store and the host (to query it later) only
/// needs an `Arc`.
impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn record(&self, event: AccessEvent) -> Result<(), AuditError> {
        (**self).record(event)
    }

    fn flush(&self) -> Result<(), AuditError> {
        (**self).flush()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}

// ============================================================================
// File-based Audit Sink
// ============================================================================

/// File-based audit sink (JSONL format)
///
/// Writes access events to a file, one JSON object per line.
pub struct FileAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditSink {
    /// Create a new file audit sink, appending to `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Create a sink in the default location for an application:
    /// `<data dir>/<app>/access.jsonl`.
    pub fn default_for_app(app_name: &str) -> Result<Self, AuditError> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".local"));
        let path = data_dir.join(app_name).join("access.jsonl");
        Self::new(path)
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: AccessEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", json)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        let mut writer = self.writer.lock().unwrap();
        writer.flush()?;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.path.parent().map(|p| p.exists()).unwrap_or(true)
    }
}

impl fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish()
    }
}

// ============================================================================
// In-Memory Audit Sink
// ============================================================================

/// In-memory audit sink for testing or short-lived sessions.
pub struct MemoryAuditSink {
    events: RwLock<Vec<AccessEvent>>,
    max_events: usize,
}

impl MemoryAuditSink {
    /// Create a new memory sink with default capacity (1000 events).
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Create a new memory sink with specified capacity.
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: RwLock::new(Vec::with_capacity(max_events.min(1000))),
            max_events,
        }
    }

    /// Get all recorded events.
    pub fn events(&self) -> Vec<AccessEvent> {
        self.events.read().unwrap().clone()
    }

    /// Get event count.
    pub fn count(&self) -> usize {
        self.events.read().unwrap().len()
    }

    /// Clear all events.
    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }

    /// Events with the given outcome.
    pub fn find_by_outcome(&self, outcome: AccessOutcome) -> Vec<AccessEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.outcome == outcome)
            .cloned()
            .collect()
    }

    /// Events whose gated key matches.
    pub fn find_by_key(&self, key: &str) -> Vec<AccessEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.key == key)
            .cloned()
            .collect()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AccessEvent) -> Result<(), AuditError> {
        let mut events = self.events.write().unwrap();
        if events.len() >= self.max_events {
            events.remove(0); // FIFO eviction
        }
        events.push(event);
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

impl fmt::Debug for MemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAuditSink")
            .field("count", &self.count())
            .field("max_events", &self.max_events)
            .finish()
    }
}

// ============================================================================
// Null and Composite Sinks
// ============================================================================

/// Null audit sink (discards all events). The default for a fresh store.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl NullAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AccessEvent) -> Result<(), AuditError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Composite audit sink that writes to multiple sinks.
pub struct CompositeAuditSink {
    sinks: Vec<Box<dyn AuditSink>>,
}

impl CompositeAuditSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl Default for CompositeAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for CompositeAuditSink {
    fn record(&self, event: AccessEvent) -> Result<(), AuditError> {
        for sink in &self.sinks {
            sink.record(event.clone())?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        for sink in &self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.sinks.iter().all(|s| s.is_healthy())
    }
}

impl fmt::Debug for CompositeAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeAuditSink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
