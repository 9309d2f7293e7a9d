//! Logging capability injected into each component.
//!
//! A [`Logger`] is a cheap, cloneable handle that fans each record out to a
//! list of sinks. `main` builds one with a [`TracingSink`] and a [`FileSink`];
//! tests build one over an in-memory sink and assert on what was emitted.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn record(&self, level: Level, message: &str);
}

/// Handle passed to components that need to report progress.
///
/// A logger with no sinks discards everything.
#[derive(Clone, Default)]
pub struct Logger {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink; records go to every sink in insertion order.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.emit(Level::DEBUG, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.emit(Level::INFO, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(Level::WARN, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.emit(Level::ERROR, message.as_ref());
    }

    fn emit(&self, level: Level, message: &str) {
        for sink in &self.sinks {
            sink.record(level, message);
        }
    }
}

/// Forwards records to the `tracing` subscriber installed by `main`.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            _ => tracing::debug!("{}", message),
        }
    }
}

/// Appends timestamped lines to a log file.
///
/// Write failures are ignored so a read-only log directory never breaks a run.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LogSink for FileSink {
    fn record(&self, level: Level, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[{}] {:<5} {}\n", timestamp, level.to_string(), message);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

/// Collects records in memory for assertions.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    records: std::sync::Mutex<Vec<(Level, String)>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn entries(&self) -> Vec<(Level, String)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Messages recorded at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn record(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, message.to_string()));
        }
    }
}
