//! Output sinks: where a running process's stdout/stderr ends up.
//!
//! The pool never calls a sink itself. It only threads a sink reference
//! through to [`super::ManagedProcess::run_async`]; the process adapter
//! decides when and how to write to it.

use tokio::sync::mpsc;

use super::types::ProcessId;

/// Which output stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A piece of output produced by a managed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// The stream the bytes were read from.
    pub stream: OutputStream,
    /// Raw bytes as delivered by the adapter (no decoding applied).
    pub data: Vec<u8>,
}

impl OutputChunk {
    /// Build a chunk from the given stream and bytes.
    pub fn new(stream: OutputStream, data: impl Into<Vec<u8>>) -> Self {
        Self {
            stream,
            data: data.into(),
        }
    }

    /// Lossy UTF-8 view of the chunk.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Consumer of a managed process's output.
///
/// Adapters may call `write` from a background task while the pool is
/// polling, so implementors must be `Send + Sync` and must not block for
/// long.
pub trait OutputSink: Send + Sync {
    /// Receive one chunk of output from the process identified by `id`.
    fn write(&self, id: &ProcessId, chunk: OutputChunk);
}

// Compile-time assertion: OutputSink must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn OutputSink) {}
};

/// Sink that forwards every chunk into an unbounded tokio channel.
///
/// Chunks written after the receiver has been dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(ProcessId, OutputChunk)>,
}

impl ChannelSink {
    /// Create a sink together with the receiving half of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ProcessId, OutputChunk)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl OutputSink for ChannelSink {
    fn write(&self, id: &ProcessId, chunk: OutputChunk) {
        if self.tx.send((id.clone(), chunk)).is_err() {
            tracing::trace!(process_id = %id, "output receiver dropped, discarding chunk");
        }
    }
}
