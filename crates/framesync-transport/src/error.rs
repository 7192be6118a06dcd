use std::path::PathBuf;

/// Errors that can occur in byte-transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the transport device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport. Transient: callers log it and
    /// keep going.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The far end is gone and no further bytes will arrive.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether the error may clear up on its own (the link is still usable).
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_io_errors_are_transient() {
        let io = TransportError::Io(std::io::Error::other("glitch"));
        assert!(io.is_transient());
        assert!(!TransportError::Closed.is_transient());

        let open = TransportError::Open {
            path: PathBuf::from("/dev/ttyGS0"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!open.is_transient());
        assert!(open.to_string().contains("/dev/ttyGS0"));
    }
}
