use bytes::{Buf, BytesMut};
use framesync_transport::ByteTransport;
use tracing::warn;

use crate::error::Result;

/// Transport view that hands out bytes already taken off the link before
/// reading from it again. Writes and drains go straight to the inner
/// transport.
pub struct Pushback<'a, T: ?Sized> {
    pending: &'a mut BytesMut,
    inner: &'a mut T,
}

impl<'a, T: ByteTransport + ?Sized> Pushback<'a, T> {
    pub fn new(pending: &'a mut BytesMut, inner: &'a mut T) -> Self {
        Self { pending, inner }
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for Pushback<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> framesync_transport::Result<usize> {
        if self.pending.is_empty() {
            return self.inner.read(buf);
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> framesync_transport::Result<usize> {
        self.inner.write(buf)
    }

    fn drain(&mut self) -> framesync_transport::Result<()> {
        self.inner.drain()
    }
}

/// Perform one read. Transient transport errors are logged and reported as
/// "no data yet"; only a closed transport is returned as an error.
pub fn read_chunk<T: ByteTransport + ?Sized>(transport: &mut T, buf: &mut [u8]) -> Result<usize> {
    match transport.read(buf) {
        Ok(n) => Ok(n),
        Err(err) if err.is_transient() => {
            warn!(error = %err, "transport read failed; ignoring");
            Ok(0)
        }
        Err(err) => Err(err.into()),
    }
}

/// Read until `buf` is completely filled.
pub fn read_window<T: ByteTransport + ?Sized>(transport: &mut T, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        filled += read_chunk(transport, &mut buf[filled..])?;
    }
    Ok(())
}
