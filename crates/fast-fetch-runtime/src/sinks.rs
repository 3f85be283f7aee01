// crates/fast-fetch-runtime/src/sinks.rs
// ============================================================================
// Module: Lifecycle and Diagnostic Sinks
// Description: JSON-line writers and in-memory recorders for slot events.
// Purpose: Give hosts and tests concrete LifecycleEventSink/DiagnosticSink.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! Lifecycle events and diagnostics are fire and forget: a sink that cannot
//! write drops the record rather than failing the pipeline. JSON-line sinks
//! emit one object per line:
//! `{"event", "timestamp_ms", "slot", "attributes"}` for lifecycle events and
//! the serialized [`Diagnostic`] for diagnostics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use fast_fetch_core::Diagnostic;
use fast_fetch_core::DiagnosticLevel;
use fast_fetch_core::DiagnosticSink;
use fast_fetch_core::LifecycleEventSink;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Lifecycle Sinks
// ============================================================================

/// Discards lifecycle events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLifecycleSink;

impl LifecycleEventSink for NoopLifecycleSink {
    fn emit(&self, _event: &str, _attributes: &BTreeMap<String, Value>) {}
}

/// Writes lifecycle events as JSON lines.
pub struct JsonLinesLifecycleSink<W: Write + Send> {
    /// Output writer.
    writer: Mutex<W>,
    /// Slot label stamped on every record.
    slot: String,
}

/// JSON-line lifecycle sink on stderr.
pub type StderrLifecycleSink = JsonLinesLifecycleSink<io::Stderr>;
/// Append-only JSON-line lifecycle sink on a file.
pub type FileLifecycleSink = JsonLinesLifecycleSink<File>;

impl<W: Write + Send> JsonLinesLifecycleSink<W> {
    /// Creates a sink over `writer`.
    pub fn new(writer: W, slot: impl Into<String>) -> Self {
        Self {
            writer: Mutex::new(writer),
            slot: slot.into(),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesLifecycleSink<io::Stderr> {
    /// Creates a sink writing to stderr.
    pub fn stderr(slot: impl Into<String>) -> Self {
        Self::new(io::stderr(), slot)
    }
}

impl JsonLinesLifecycleSink<File> {
    /// Opens `path` for appending, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the file cannot be opened.
    pub fn open_append(path: &Path, slot: impl Into<String>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file, slot))
    }
}

impl<W: Write + Send> LifecycleEventSink for JsonLinesLifecycleSink<W> {
    fn emit(&self, event: &str, attributes: &BTreeMap<String, Value>) {
        let record = json!({
            "event": event,
            "timestamp_ms": now_ms(),
            "slot": self.slot,
            "attributes": attributes,
        });
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if serde_json::to_writer(&mut *guard, &record).is_ok() {
            let _ = guard.write_all(b"\n");
            let _ = guard.flush();
        }
    }
}

/// Lifecycle event captured by [`MemoryLifecycleSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name.
    pub event: String,
    /// Event attributes.
    pub attributes: BTreeMap<String, Value>,
}

/// Records lifecycle events in memory.
#[derive(Debug, Default)]
pub struct MemoryLifecycleSink {
    /// Captured events in emission order.
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryLifecycleSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every captured event.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the captured event names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|record| record.event.clone())
            .collect()
    }

    /// Returns the first captured event named `event`.
    #[must_use]
    pub fn find(&self, event: &str) -> Option<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|record| record.event == event)
            .cloned()
    }

    /// Counts captured events named `event`.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.event == event)
            .count()
    }
}

impl LifecycleEventSink for MemoryLifecycleSink {
    fn emit(&self, event: &str, attributes: &BTreeMap<String, Value>) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(RecordedEvent {
            event: event.to_string(),
            attributes: attributes.clone(),
        });
    }
}

// ============================================================================
// SECTION: Diagnostic Sinks
// ============================================================================

/// Discards diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticSink for NoopDiagnostics {
    fn record(&self, _diagnostic: Diagnostic) {}
}

/// Writes diagnostics to stderr as JSON lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl DiagnosticSink for StderrDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        let mut stderr = io::stderr().lock();
        if serde_json::to_writer(&mut stderr, &diagnostic).is_ok() {
            let _ = stderr.write_all(b"\n");
        }
    }
}

/// Records diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    /// Captured diagnostics in order.
    records: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every captured diagnostic.
    #[must_use]
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns diagnostics recorded at `level`.
    #[must_use]
    pub fn at_level(&self, level: DiagnosticLevel) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|diagnostic| diagnostic.level == level)
            .cloned()
            .collect()
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn record(&self, diagnostic: Diagnostic) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(diagnostic);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Milliseconds since the Unix epoch, saturating.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
