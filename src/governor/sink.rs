//! Destinations for admitted log records.
//!
//! - [`TracingSink`]: forwards to `tracing` (default).
//! - [`FileSink`]: appends `YYYY-mm-dd HH:MM:SS LEVEL text` lines.
//! - [`MemorySink`]: keeps records in memory, shared with a cloned handle.
//!
//! Every sink ignores writes after [`LogSink::close`].

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ConfigError;
use crate::switch::Level;

/// Where the governor writes.
pub trait LogSink: Send + 'static {
    /// Writes one line.
    fn write(&mut self, level: Level, text: &str) -> io::Result<()>;

    /// Flushes and releases the destination. Later writes are ignored.
    fn close(&mut self) -> io::Result<()>;
}

/// Emits records as `tracing` events under the `switchyard::log` target.
#[derive(Debug, Default)]
pub struct TracingSink {
    closed: bool,
}

impl TracingSink {
    /// Open sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for TracingSink {
    fn write(&mut self, level: Level, text: &str) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        match level {
            Level::Info => tracing::info!(target: "switchyard::log", "{text}"),
            Level::Warning => tracing::warn!(target: "switchyard::log", "{text}"),
            Level::Error | Level::Critical => {
                tracing::error!(target: "switchyard::log", level = level.as_str(), "{text}")
            }
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Appends timestamped lines to a file.
#[derive(Debug)]
pub struct FileSink {
    out: Option<BufWriter<File>>,
}

impl FileSink {
    /// Opens (or creates) `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: Some(BufWriter::new(file)),
        })
    }
}

impl LogSink for FileSink {
    fn write(&mut self, level: Level, text: &str) -> io::Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(out, "{stamp} {} {text}", level.as_str().to_uppercase())?;
        out.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.out.take() {
            Some(mut out) => out.flush(),
            None => Ok(()),
        }
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written so far.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True once closed.
    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for MemorySink {
    fn write(&mut self, level: Level, text: &str) -> io::Result<()> {
        if !self.is_closed() {
            self.lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((level, text.to_string()));
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_appends_stamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let mut sink = FileSink::open(&path).unwrap();
        sink.write(Level::Warning, "disk almost full").unwrap();
        sink.close().unwrap();
        sink.write(Level::Error, "after close").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" WARNING disk almost full"));
        // "YYYY-mm-dd HH:MM:SS " prefix
        assert_eq!(lines[0].as_bytes()[4], b'-');
        assert_eq!(lines[0].as_bytes()[19], b' ');
    }

    #[test]
    fn memory_sink_ignores_writes_after_close() {
        let mut sink = MemorySink::new();
        let view = sink.clone();
        sink.write(Level::Info, "one").unwrap();
        sink.close().unwrap();
        sink.write(Level::Info, "two").unwrap();

        assert_eq!(view.lines(), vec![(Level::Info, "one".to_string())]);
        assert!(view.is_closed());
    }
}
