use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wrapngo::exec::Archiver;
use wrapngo::logging::{OutputSink, OutputStream};

/// Sink that keeps every captured line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(OutputStream, String, String)>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Lines written to `stream`, in arrival order.
    pub fn lines(&self, stream: OutputStream) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _, _)| *s == stream)
            .map(|(_, _, line)| line.clone())
            .collect()
    }

    /// `(origin, line)` pairs written to `stream`.
    pub fn entries(&self, stream: OutputStream) -> Vec<(String, String)> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _, _)| *s == stream)
            .map(|(_, origin, line)| (origin.clone(), line.clone()))
            .collect()
    }
}

impl OutputSink for MemorySink {
    fn write_line(&self, stream: OutputStream, origin: &str, line: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((stream, origin.to_string(), line.to_string()));
    }
}

/// An archiver that:
/// - records every `(source, overwrite)` call
/// - optionally waits before answering
/// - returns a fixed path or a fixed error.
#[derive(Debug)]
pub struct FakeArchiver {
    result: Result<PathBuf, String>,
    delay: Duration,
    calls: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeArchiver {
    pub fn succeeding(output: impl Into<PathBuf>) -> Self {
        Self {
            result: Ok(output.into()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Archiver for FakeArchiver {
    fn archive<'a>(
        &'a self,
        source: &'a Path,
        overwrite: bool,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((source.to_path_buf(), overwrite));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone().map_err(|msg| anyhow::anyhow!(msg))
        })
    }
}
