//! Event sinks
//!
//! A sink receives fully processed events. The emitter keeps two groups:
//! canonical sinks get the legacy-schema event, analytics sinks get the
//! Google Analytics copy.

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::models::Event;

/// Destination for processed events
pub trait EventSink: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    fn send(&self, event: &Event) -> Result<()>;
}

/// Keeps every event in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn send(&self, event: &Event) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}

/// Writes one JSON document per line
pub struct JsonLinesSink<W> {
    name: &'static str,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(name: &'static str, writer: W) -> Self {
        Self {
            name,
            writer: Mutex::new(writer),
        }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonLinesSink<LineWriter<File>> {
    /// Append to the file at `path`, creating it if needed
    pub fn open(name: &'static str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::sink(name, format!("cannot open {}: {}", path.display(), e)))?;

        tracing::info!(sink = name, path = %path.display(), "Opened JSON lines sink");
        Ok(Self::new(name, LineWriter::new(file)))
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn send(&self, event: &Event) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer
            .write_all(&line)
            .map_err(|e| Error::sink(self.name, e.to_string()))
    }
}

impl<W> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").field("name", &self.name).finish()
    }
}

/// Logs each event at info level
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    name: &'static str,
}

impl TracingSink {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl EventSink for TracingSink {
    fn name(&self) -> &'static str {
        self.name
    }

    fn send(&self, event: &Event) -> Result<()> {
        let body = serde_json::to_string(event)?;
        tracing::info!(
            sink = self.name,
            name = event.name().unwrap_or_default(),
            event = %body,
            "Event emitted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let view = sink.clone();

        sink.send(&Event::new("first")).unwrap();
        sink.send(&Event::new("second")).unwrap();

        let names: Vec<_> = view.events().iter().map(|e| e.name().map(str::to_owned)).collect();
        assert_eq!(names, vec![Some("first".to_owned()), Some("second".to_owned())]);

        view.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_json_lines_sink_writes_one_line_per_event() {
        let sink = JsonLinesSink::new("tracking_log", Vec::new());
        sink.send(&Event::new("a")).unwrap();
        sink.send(&Event::try_from(json!({"name": "b", "event": "{}"})).unwrap()).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines, vec![json!({"name": "a"}), json!({"name": "b", "event": "{}"})]);
    }

    #[test]
    fn test_json_lines_sink_reports_write_failures() {
        let sink = JsonLinesSink::new("tracking_log", BrokenWriter);
        let err = sink.send(&Event::new("a")).unwrap_err();
        assert!(matches!(err, Error::Sink { sink: "tracking_log", .. }));
    }

    #[test]
    fn test_json_lines_sink_appends_to_file() {
        let path = std::env::temp_dir().join(format!("trackforge-{}.log", uuid::Uuid::new_v4()));
        {
            let sink = JsonLinesSink::open("tracking_log", &path).unwrap();
            sink.send(&Event::new("a")).unwrap();
        }
        {
            let sink = JsonLinesSink::open("tracking_log", &path).unwrap();
            sink.send(&Event::new("b")).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_tracing_sink_accepts_events() {
        let sink = TracingSink::new("tracking_log");
        assert!(sink.send(&Event::new("a")).is_ok());
        assert_eq!(sink.name(), "tracking_log");
    }
}
