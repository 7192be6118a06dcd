use framesync_transport::TransportError;

use crate::base64::DecodeError;

/// Errors that can occur while synchronizing, assembling or encoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The transport failed in a way the read path cannot ride out.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The frame length leaves no room for the footer.
    #[error("invalid frame layout: frame length {frame_len} must exceed the {footer_len}-byte footer")]
    InvalidLayout { frame_len: usize, footer_len: usize },

    /// A frame window does not match the layout length.
    #[error("frame window is {actual} bytes, layout expects {expected}")]
    WindowSize { expected: usize, actual: usize },

    /// The preamble cannot be used for synchronization.
    #[error("invalid preamble: {0}")]
    InvalidPreamble(String),

    /// A payload is not valid base64.
    #[error("payload decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The payload exceeds the payload region of the layout.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl FrameError {
    /// Whether this error means the transport is gone for good.
    pub fn is_closed(&self) -> bool {
        matches!(self, FrameError::Transport(TransportError::Closed))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
