// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Line-delimited JSON telemetry
//!
//! The substrate emits [`TelemetryRecord`]s through a [`TelemetryHandle`].
//! A handle without a sink drops records; a sink that fails is logged and
//! otherwise ignored so the simulation keeps stepping.

use std::io::Write;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TelemetryError;

/// One telemetry line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub version: u32,
    pub phase: String,
    pub event: String,
    pub step: u64,
    /// ISO-8601 UTC
    pub timestamp: String,
    pub payload: Value,
}

impl TelemetryRecord {
    pub fn new(
        version: u32,
        phase: impl Into<String>,
        event: impl Into<String>,
        step: u64,
        payload: Value,
    ) -> Self {
        Self {
            version,
            phase: phase.into(),
            event: event.into(),
            step,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            payload,
        }
    }

    /// Serialize without the trailing newline
    pub fn to_json_line(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Destination for telemetry records
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}

/// Writes one JSON object per line to any writer
pub struct JsonLinesTelemetry<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTelemetry<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesTelemetry<W> {
    fn emit(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let line = record.to_json_line()?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Hands each serialized line to a callback
pub struct CallbackTelemetry {
    callback: Box<dyn Fn(&str) + Send + Sync>,
}

impl CallbackTelemetry {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl TelemetrySink for CallbackTelemetry {
    fn emit(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let line = record.to_json_line()?;
        (self.callback)(&line);
        Ok(())
    }
}

/// Keeps records in memory; used by tests and embedders that poll
#[derive(Default)]
pub struct MemoryTelemetry {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    /// Records whose event name matches
    pub fn events(&self, event: &str) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event == event)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn emit(&self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Cheap, clonable front for an optional sink
///
/// Stamps version and phase on every record.
#[derive(Clone)]
pub struct TelemetryHandle {
    sink: Option<Arc<dyn TelemetrySink>>,
    version: u32,
    phase: Arc<str>,
}

impl Default for TelemetryHandle {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for TelemetryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHandle")
            .field("enabled", &self.sink.is_some())
            .field("version", &self.version)
            .field("phase", &self.phase)
            .finish()
    }
}

impl TelemetryHandle {
    pub fn new(sink: Arc<dyn TelemetrySink>, version: u32, phase: &str) -> Self {
        Self {
            sink: Some(sink),
            version,
            phase: Arc::from(phase),
        }
    }

    pub fn disabled() -> Self {
        Self {
            sink: None,
            version: 1,
            phase: Arc::from("core"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Emit a record; sink failures are logged at `warn` and swallowed
    pub fn emit(&self, event: &str, step: u64, payload: Value) {
        let Some(sink) = &self.sink else {
            return;
        };
        let record = TelemetryRecord::new(self.version, &*self.phase, event, step, payload);
        if let Err(e) = sink.emit(&record) {
            tracing::warn!(target: "telemetry", event, step, error = %e, "telemetry sink rejected record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_record_line_shape() {
        let record = TelemetryRecord::new(2, "phase4", "reward", 17, json!({"r": 0.5}));
        let line = record.to_json_line().unwrap();
        assert!(!line.contains('\n'));

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["version"], 2);
        assert_eq!(parsed["phase"], "phase4");
        assert_eq!(parsed["event"], "reward");
        assert_eq!(parsed["step"], 17);
        assert_eq!(parsed["payload"]["r"], 0.5);

        let ts = parsed["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_json_lines_writes_one_line_per_record() {
        let sink = JsonLinesTelemetry::new(Vec::new());
        sink.emit(&TelemetryRecord::new(1, "core", "a", 0, Value::Null)).unwrap();
        sink.emit(&TelemetryRecord::new(1, "core", "b", 1, Value::Null)).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"event\":\"b\""));
    }

    #[test]
    fn test_callback_receives_lines() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen_clone = seen.clone();
        let sink = CallbackTelemetry::new(move |line| seen_clone.lock().push(line.to_string()));

        let handle = TelemetryHandle::new(Arc::new(sink), 1, "core");
        handle.emit("attention", 3, json!({"boost": 1.5}));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("attention"));
    }

    #[test]
    fn test_handle_swallows_sink_failure() {
        let handle = TelemetryHandle::new(Arc::new(JsonLinesTelemetry::new(BrokenWriter)), 1, "core");
        handle.emit("reward", 0, Value::Null);
        TelemetryHandle::disabled().emit("reward", 0, Value::Null);
    }

    #[test]
    fn test_memory_filters_by_event() {
        let memory = Arc::new(MemoryTelemetry::new());
        let handle = TelemetryHandle::new(memory.clone(), 1, "core");
        handle.emit("reward", 1, Value::Null);
        handle.emit("consolidation", 2, Value::Null);
        handle.emit("reward", 3, Value::Null);

        assert_eq!(memory.len(), 3);
        assert_eq!(memory.events("reward").len(), 2);
        memory.clear();
        assert!(memory.is_empty());
    }
}
