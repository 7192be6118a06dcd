//! Consumers of decoded payloads.

use std::io::{self, Write};

use bytes::Bytes;

/// Receives each fresh, decoded payload exactly once, in arrival order.
pub trait PayloadSink {
    fn deliver(&mut self, payload: Bytes) -> io::Result<()>;
}

impl<S: PayloadSink + ?Sized> PayloadSink for &mut S {
    fn deliver(&mut self, payload: Bytes) -> io::Result<()> {
        (**self).deliver(payload)
    }
}

impl<S: PayloadSink + ?Sized> PayloadSink for Box<S> {
    fn deliver(&mut self, payload: Bytes) -> io::Result<()> {
        (**self).deliver(payload)
    }
}

/// Collects payloads in memory.
impl PayloadSink for Vec<Bytes> {
    fn deliver(&mut self, payload: Bytes) -> io::Result<()> {
        self.push(payload);
        Ok(())
    }
}

/// Writes payload bytes back to back and flushes after each.
#[derive(Debug)]
pub struct RawSink<W> {
    writer: W,
}

impl<W: Write> RawSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PayloadSink for RawSink<W> {
    fn deliver(&mut self, payload: Bytes) -> io::Result<()> {
        self.writer.write_all(&payload)?;
        self.writer.flush()
    }
}

/// Writes each payload as a native-endian `u32` length followed by the bytes,
/// so a reader on the other end of a pipe can recover payload boundaries.
#[derive(Debug)]
pub struct LengthPrefixedSink<W> {
    writer: W,
}

impl<W: Write> LengthPrefixedSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PayloadSink for LengthPrefixedSink<W> {
    fn deliver(&mut self, payload: Bytes) -> io::Result<()> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload of {} bytes exceeds a u32 length prefix", payload.len()),
            )
        })?;
        self.writer.write_all(&len.to_ne_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.flush()
    }
}
