//! Frame synchronization over unframed serial links.
//!
//! framesync recovers fixed-length, CRC-protected frames of base64 text from a
//! byte stream that may start mid-frame, lose bytes or be interrupted by the
//! sender at any point, and answers every frame with an acknowledgement.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-transport contract, serial device, in-memory script
//! - [`frame`]: preamble scanning, frame assembly, CRC-32 and base64
//! - [`session`]: the receive-side handshake and retry controller

/// Re-export transport types.
pub mod transport {
    pub use framesync_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use framesync_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use framesync_session::*;
}
