use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteTransport;

/// A serial character device (e.g. `/dev/ttyGS0`).
///
/// Line discipline and baud rate are left as configured by the system; this
/// type only moves bytes. A zero-length read is "no data yet" (a terminal in
/// timed-read mode returns 0 when the timer expires), and device-gone errors
/// map to [`TransportError::Closed`].
pub struct SerialDevice {
    file: File,
    path: PathBuf,
}

impl SerialDevice {
    /// Open a character device for reading and writing without making it the
    /// controlling terminal.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_SYNC)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        info!(?path, "opened serial device");
        Ok(Self { file, path })
    }

    /// The device path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteTransport for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(device_error(err)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            match self.file.write(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(device_error(err)),
            }
        }
    }

    fn drain(&mut self) -> Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: `fd` is an open descriptor owned by `self.file` for the
        // duration of this call.
        let rc = unsafe { libc::tcdrain(fd) };
        if rc == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOTTY) {
            // FIFOs and regular files used for bench testing are not terminals.
            debug!(path = ?self.path, "tcdrain unsupported; flushing instead");
            return self.file.flush().map_err(device_error);
        }
        Err(device_error(err))
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("path", &self.path)
            .finish()
    }
}

fn device_error(err: std::io::Error) -> TransportError {
    match err.raw_os_error() {
        Some(libc::EIO) | Some(libc::ENXIO) | Some(libc::ENODEV) => TransportError::Closed,
        _ if err.kind() == ErrorKind::BrokenPipe => TransportError::Closed,
        _ => TransportError::Io(err),
    }
}
