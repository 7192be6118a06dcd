use std::collections::BTreeSet;

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::ByteTransport;

/// An in-memory transport: replays a fixed inbound script and captures every
/// outbound byte.
///
/// Reads hand out at most `max_read` bytes per call, so partial-read handling
/// can be exercised. Once the script is exhausted every read reports
/// [`TransportError::Closed`].
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: Bytes,
    pos: usize,
    max_read: usize,
    failing_reads: BTreeSet<usize>,
    reads: usize,
    outbound: BytesMut,
    drains: usize,
}

impl MemoryTransport {
    /// Create a transport that will deliver `inbound` to the reader.
    pub fn new(inbound: impl Into<Bytes>) -> Self {
        Self {
            inbound: inbound.into(),
            pos: 0,
            max_read: usize::MAX,
            failing_reads: BTreeSet::new(),
            reads: 0,
            outbound: BytesMut::new(),
            drains: 0,
        }
    }

    /// Cap the number of bytes returned by a single read.
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read.max(1);
        self
    }

    /// Make the read call with the given zero-based index fail with a
    /// transient I/O error (no bytes are consumed by that call).
    pub fn with_failing_read(mut self, call_index: usize) -> Self {
        self.failing_reads.insert(call_index);
        self
    }

    /// Everything written so far.
    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    /// Take the captured outbound bytes, leaving the capture empty.
    pub fn take_outbound(&mut self) -> Bytes {
        self.outbound.split().freeze()
    }

    /// Inbound bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.inbound.len() - self.pos
    }

    /// Number of read calls made, failed ones included.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of drain calls made.
    pub fn drains(&self) -> usize {
        self.drains
    }
}

impl ByteTransport for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let call = self.reads;
        self.reads += 1;

        if self.failing_reads.remove(&call) {
            return Err(TransportError::Io(std::io::Error::other(
                "injected read failure",
            )));
        }
        if self.pos >= self.inbound.len() {
            return Err(TransportError::Closed);
        }

        let n = buf.len().min(self.max_read).min(self.remaining());
        buf[..n].copy_from_slice(&self.inbound[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn drain(&mut self) -> Result<()> {
        self.drains += 1;
        Ok(())
    }
}
