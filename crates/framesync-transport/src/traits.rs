use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};

/// An ordered, reliable, unframed byte link.
///
/// `read` may return fewer bytes than requested. `Ok(0)` means "no data yet"
/// and is not an end-of-stream signal; a transport that knows the far end is
/// gone reports [`TransportError::Closed`] instead.
pub trait ByteTransport {
    /// Read up to `buf.len()` bytes (blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Block until every written byte has been physically transmitted.
    fn drain(&mut self) -> Result<()>;

    /// Write all of `buf`, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(TransportError::Closed),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn drain(&mut self) -> Result<()> {
        (**self).drain()
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn drain(&mut self) -> Result<()> {
        (**self).drain()
    }
}

/// Adapts a `Read` half and a `Write` half into a [`ByteTransport`].
///
/// Unlike a serial device, a stream reaching EOF will never produce more
/// bytes, so a zero-length read maps to [`TransportError::Closed`].
#[derive(Debug)]
pub struct StreamTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> StreamTransport<R, W> {
    /// Create a transport from separate read and write halves.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Borrow the read half.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Borrow the write half.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Consume the transport and return both halves.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: Read, W: Write> ByteTransport for StreamTransport<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.reader.read(buf) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(stream_error(err)),
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            match self.writer.write(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(stream_error(err)),
            }
        }
    }

    fn drain(&mut self) -> Result<()> {
        loop {
            match self.writer.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(stream_error(err)),
            }
        }
    }
}

fn stream_error(err: std::io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::UnexpectedEof => {
            TransportError::Closed
        }
        _ => TransportError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn stream_reads_then_reports_closed() {
        let mut transport = StreamTransport::new(Cursor::new(b"abc".to_vec()), Vec::new());
        let mut buf = [0u8; 8];

        assert_eq!(transport.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert!(matches!(
            transport.read(&mut buf),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn empty_buffer_read_is_not_eof() {
        let mut transport = StreamTransport::new(Cursor::new(Vec::new()), Vec::new());
        assert_eq!(transport.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn write_all_and_drain_reach_writer() {
        let mut transport = StreamTransport::new(Cursor::new(Vec::new()), Vec::new());
        transport.write_all(b"%READY%").unwrap();
        transport.drain().unwrap();

        let (_, written) = transport.into_inner();
        assert_eq!(written, b"%READY%");
    }

    #[test]
    fn broken_pipe_maps_to_closed() {
        let mut transport = StreamTransport::new(Cursor::new(Vec::new()), BrokenWriter);
        assert!(matches!(
            transport.write_all(b"x"),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            data: b"ok".to_vec(),
        };
        let mut transport = StreamTransport::new(reader, Vec::new());
        let mut buf = [0u8; 4];
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ok");
    }

    #[test]
    fn write_all_through_mutable_reference() {
        fn announce<T: ByteTransport>(mut transport: T) {
            transport.write_all(b"ref").unwrap();
            transport.drain().unwrap();
        }

        let mut inner = StreamTransport::new(Cursor::new(Vec::new()), Vec::new());
        announce(&mut inner);
        assert_eq!(inner.writer().as_slice(), b"ref");
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Ok(n)
        }
    }
}
