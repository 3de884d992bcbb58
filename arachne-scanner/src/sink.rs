use crate::page::DiscoveredPage;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Append-only destination for discovered pages.
///
/// Each call must land as one unit; concurrent callers may be reordered but
/// never interleaved within a record.
pub trait Sink: Send + Sync {
    fn emit(&self, id: &str, content: &str);

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic elsewhere must not stop the remaining records from being written
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes `found: <id> "<content>"` lines.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a line that is not a page record, e.g. a separator.
    pub fn write_line(&self, line: &str) {
        let mut writer = lock(&self.writer);
        if let Err(e) = writeln!(writer, "{}", line) {
            warn!("Failed to write line: {}", e);
        }
    }
}

pub fn format_record(id: &str, content: &str) -> String {
    format!("found: {} {:?}\n", id, content)
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn emit(&self, id: &str, content: &str) {
        let line = format_record(id, content);
        let mut writer = lock(&self.writer);
        if let Err(e) = writer.write_all(line.as_bytes()) {
            warn!("Failed to write record for {}: {}", id, e);
        }
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.writer).flush()
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
    fn emit(&self, id: &str, content: &str) {
        let record = DiscoveredPage::new(id, content);
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize record for {}: {}", id, e);
                return;
            }
        };
        line.push('\n');

        let mut writer = lock(&self.writer);
        if let Err(e) = writer.write_all(line.as_bytes()) {
            warn!("Failed to write record for {}: {}", id, e);
        }
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.writer).flush()
    }
}

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectSink {
    pages: Mutex<Vec<DiscoveredPage>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> Vec<DiscoveredPage> {
        lock(&self.pages).clone()
    }

    pub fn take(&self) -> Vec<DiscoveredPage> {
        std::mem::take(&mut *lock(&self.pages))
    }

    pub fn len(&self) -> usize {
        lock(&self.pages).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.pages).is_empty()
    }
}

impl Sink for CollectSink {
    fn emit(&self, id: &str, content: &str) {
        lock(&self.pages).push(DiscoveredPage::new(id, content));
    }
}

/// Forwards every record to each inner sink in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Sink for FanoutSink {
    fn emit(&self, id: &str, content: &str) {
        for sink in &self.sinks {
            sink.emit(id, content);
        }
    }

    fn flush(&self) -> io::Result<()> {
        for sink in &self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}
