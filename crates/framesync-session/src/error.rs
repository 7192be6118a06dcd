use std::fmt;
use std::io;

use framesync_frame::{ChecksumMismatch, DecodeError, FrameError, ResyncReason};
use framesync_transport::TransportError;

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The session configuration is unusable.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    /// The payload sink rejected a payload.
    #[error("payload sink failed: {0}")]
    Sink(#[source] io::Error),
}

impl SessionError {
    /// Whether the session ended because the transport went away.
    pub fn is_closed(&self) -> bool {
        match self {
            SessionError::Transport(TransportError::Closed) => true,
            SessionError::Frame(err) => err.is_closed(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// A recoverable protocol condition. Faults are logged and counted; the
/// session carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// No preamble within the retry budget.
    SyncTimeout,
    /// Assembly was abandoned.
    FrameResync(ResyncReason),
    /// The footer checksum does not match the payload.
    ChecksumMismatch(ChecksumMismatch),
    /// A checksum-valid payload is not valid base64.
    Decode(DecodeError),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::SyncTimeout => f.write_str("sync timeout"),
            Fault::FrameResync(reason) => write!(f, "frame resync ({reason})"),
            Fault::ChecksumMismatch(mismatch) => write!(f, "{mismatch}"),
            Fault::Decode(err) => write!(f, "{err}"),
        }
    }
}
