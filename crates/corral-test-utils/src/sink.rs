use std::sync::Mutex;

use corral_core::{OutputChunk, OutputSink, OutputStream, ProcessId};

/// Sink that keeps every chunk it receives in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    chunks: Mutex<Vec<(ProcessId, OutputChunk)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All chunks received so far, in arrival order.
    pub fn chunks(&self) -> Vec<(ProcessId, OutputChunk)> {
        self.chunks.lock().expect("recording sink poisoned").clone()
    }

    /// Concatenated text one process wrote to one stream.
    pub fn text_for(&self, id: &ProcessId, stream: OutputStream) -> String {
        self.chunks()
            .into_iter()
            .filter(|(from, chunk)| from == id && chunk.stream == stream)
            .map(|(_, chunk)| chunk.text())
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn write(&self, id: &ProcessId, chunk: OutputChunk) {
        self.chunks
            .lock()
            .expect("recording sink poisoned")
            .push((id.clone(), chunk));
    }
}
