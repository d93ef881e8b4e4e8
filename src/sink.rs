// src/sink.rs

//! Log sink collaborator for child output.
//!
//! The supervisor and the reader loop hand the child's output to a
//! [`LogSink`] one line at a time. The sink is a plain synchronous
//! collaborator injected by the caller; the crate never persists logs,
//! it only forwards them as they are produced.

use tracing::info;

/// Receives discrete text lines attributed to the child's combined
/// stdout/stderr stream.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

/// Routes child output through the `tracing` pipeline at `info`.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        info!(target: "spawnwatch::child", "{}", line);
    }
}

/// Prints child output straight to stdout.
///
/// This is the CLI default: our own diagnostics go to stderr, so stdout
/// carries nothing but the child's output.
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&self, line: &str) {
        println!("{line}");
    }
}

/// Splits a byte stream into lines and forwards them to a sink.
///
/// Chunks read from the pipe can end mid-line; the remainder is carried
/// in an owned, growable buffer until the next chunk (or [`flush`])
/// completes it. Byte order is preserved; empty lines are dropped.
///
/// [`flush`]: LineBuffer::flush
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { partial: Vec::new() }
    }

    /// Append a chunk and emit every line it completes.
    pub fn push(&mut self, chunk: &[u8], sink: &dyn LogSink) {
        self.partial.extend_from_slice(chunk);

        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let rest = self.partial.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.partial, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                sink.log(&String::from_utf8_lossy(&line));
            }
        }
    }

    /// Emit any trailing partial line. Called once the stream is done
    /// (or won't be watched any further).
    pub fn flush(&mut self, sink: &dyn LogSink) {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            sink.log(&String::from_utf8_lossy(&line));
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
