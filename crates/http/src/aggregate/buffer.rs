use bytes::Bytes;
use tracing::trace;

/// The chunks of the message being aggregated.
///
/// The buffer owns every admitted chunk until [`ContentBuffer::into_chunks`] hands them
/// on; dropping it on any other path releases them.
#[derive(Debug, Default)]
pub(crate) struct ContentBuffer {
    chunks: Vec<Bytes>,
    len: u64,
}

impl ContentBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `chunk` and returns the new total length.
    pub(crate) fn push(&mut self, chunk: Bytes) -> u64 {
        self.len += chunk.len() as u64;
        if !chunk.is_empty() {
            trace!(len = chunk.len(), total = self.len, "admitted chunk");
            self.chunks.push(chunk);
        }
        self.len
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn into_chunks(mut self) -> Vec<Bytes> {
        self.len = 0;
        std::mem::take(&mut self.chunks)
    }
}

impl Drop for ContentBuffer {
    fn drop(&mut self) {
        if !self.chunks.is_empty() {
            trace!(chunks = self.chunks.len(), len = self.len, "released buffered content");
        }
    }
}
