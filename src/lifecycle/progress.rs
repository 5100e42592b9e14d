//! Operator-facing progress messages.
//!
//! These are the fixed lines printed on stdout at each phase boundary.
//! Diagnostics go through `tracing` on stderr instead.

use std::io::Write;
use std::sync::Mutex;

/// Destination for progress lines.
pub trait ProgressSink: Send + Sync {
    fn message(&self, text: &str);
}

/// Prints each line to stdout and flushes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn message(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

/// Keeps lines in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgress {
    fn message(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}
