//! Frame synchronization for unframed serial byte streams.
//!
//! This is the core layer of framesync. A frame is a fixed-length window of
//! base64 text followed by a footer:
//! - a 3-byte `CRC` tag
//! - an 8-digit uppercase hex CRC-32 of the payload region
//! - a 4-byte sequence counter used for duplicate suppression
//!
//! Synchronization is acquired by matching a known preamble at any phase of
//! the read window, and dropped whenever the sender emits a `%IGNORE%`
//! control token.

pub mod assembler;
pub mod base64;
pub mod codec;
pub mod dedup;
pub mod encoder;
pub mod error;
pub mod integrity;
pub mod marker;
pub mod reader;
pub mod scanner;

pub use assembler::{
    FrameAssembler, FrameState, ResyncReason, DEFAULT_FILL_CHUNK, DEFAULT_TAG_CONFIRMATIONS,
};
pub use base64::DecodeError;
pub use codec::{encode_frame, Frame, FrameLayout, DEFAULT_FRAME_LEN, FILLER, FOOTER_LEN, TAG};
pub use dedup::{Deduplicator, SequenceCounter};
pub use encoder::StreamEncoder;
pub use error::{FrameError, Result};
pub use integrity::{check, verify, Checksum, ChecksumMismatch};
pub use marker::{
    is_control_token, Preamble, TokenWatch, DEFAULT_PREAMBLE, DEFAULT_SCAN_WINDOW, IGNORE_TOKEN,
};
pub use reader::Pushback;
pub use scanner::{PreambleScanner, RetryBudget, ScanOutcome, SyncMode, DEFAULT_RETRY_BUDGET};
