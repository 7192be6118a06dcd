use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use crate::base64::{self, DecodeError};
use crate::dedup::SequenceCounter;
use crate::error::{FrameError, Result};
use crate::integrity::Checksum;

/// Default frame length: 1044 bytes of payload plus the 24-byte footer.
pub const DEFAULT_FRAME_LEN: usize = 1056 + 12;

/// Footer: tag (3) + separator (1) + checksum (8) + counter (4) + reserved (8).
pub const FOOTER_LEN: usize = 24;

/// Literal tag opening the footer.
pub const TAG: [u8; 3] = *b"CRC";

/// Byte an empty frame window is filled with.
pub const FILLER: u8 = b'-';

/// Byte between the tag and the checksum digits.
pub const SEPARATOR: u8 = b' ';

/// Byte used to pad a short payload up to the payload region.
pub const PAD: u8 = b'=';

pub const CHECKSUM_LEN: usize = 8;
pub const COUNTER_LEN: usize = 4;
pub const RESERVED_LEN: usize = 8;

const TAG_AT: usize = 0;
const CHECKSUM_AT: usize = 4;
const COUNTER_AT: usize = CHECKSUM_AT + CHECKSUM_LEN;

/// Offsets of every frame field, derived from the frame length and the fixed
/// footer.
///
/// ```text
/// ┌────────────────────────┬─────┬───┬──────────┬─────────┬──────────┐
/// │ Payload (base64 text)  │ CRC │ ␠ │ Checksum │ Counter │ Reserved │
/// │ frame_len - 24 bytes   │ 3B  │1B │ 8B hex   │ 4B      │ 8B       │
/// └────────────────────────┴─────┴───┴──────────┴─────────┴──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    frame_len: usize,
}

impl FrameLayout {
    /// The layout used by the deployed sender.
    pub const fn standard() -> Self {
        Self {
            frame_len: DEFAULT_FRAME_LEN,
        }
    }

    /// Build a layout for an explicit frame length.
    pub fn new(frame_len: usize) -> Result<Self> {
        if frame_len <= FOOTER_LEN {
            return Err(FrameError::InvalidLayout {
                frame_len,
                footer_len: FOOTER_LEN,
            });
        }
        Ok(Self { frame_len })
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Length of the payload region covered by the checksum.
    pub fn payload_len(&self) -> usize {
        self.frame_len - FOOTER_LEN
    }

    pub fn payload_range(&self) -> Range<usize> {
        0..self.payload_len()
    }

    pub fn tag_range(&self) -> Range<usize> {
        let start = self.payload_len() + TAG_AT;
        start..start + TAG.len()
    }

    pub fn checksum_range(&self) -> Range<usize> {
        let start = self.payload_len() + CHECKSUM_AT;
        start..start + CHECKSUM_LEN
    }

    pub fn counter_range(&self) -> Range<usize> {
        let start = self.payload_len() + COUNTER_AT;
        start..start + COUNTER_LEN
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// A complete frame window, immutable once assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    window: Bytes,
    layout: FrameLayout,
}

impl Frame {
    /// Wrap a full window. The window length must equal the layout length.
    pub fn from_window(window: impl Into<Bytes>, layout: FrameLayout) -> Result<Self> {
        let window = window.into();
        if window.len() != layout.frame_len() {
            return Err(FrameError::WindowSize {
                expected: layout.frame_len(),
                actual: window.len(),
            });
        }
        Ok(Self { window, layout })
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// The whole window, footer included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.window
    }

    /// The base64 payload region.
    pub fn payload(&self) -> &[u8] {
        &self.window[self.layout.payload_range()]
    }

    pub fn tag(&self) -> &[u8] {
        &self.window[self.layout.tag_range()]
    }

    /// Whether the footer opens with the `CRC` tag.
    pub fn has_valid_tag(&self) -> bool {
        self.tag() == TAG
    }

    /// The checksum digits exactly as received.
    pub fn checksum_hex(&self) -> &[u8] {
        &self.window[self.layout.checksum_range()]
    }

    pub fn counter(&self) -> SequenceCounter {
        let mut bytes = [0u8; COUNTER_LEN];
        bytes.copy_from_slice(&self.window[self.layout.counter_range()]);
        SequenceCounter::new(bytes)
    }

    /// Decode the payload region into an owned buffer.
    pub fn decode_payload(&self) -> std::result::Result<Bytes, DecodeError> {
        base64::decode(self.payload())
    }
}

/// Encode one frame window into `dst`.
///
/// The payload is padded with `=` up to the payload region, which the
/// decoder treats as end of data.
pub fn encode_frame(
    payload: &[u8],
    counter: SequenceCounter,
    layout: FrameLayout,
    dst: &mut BytesMut,
) -> Result<()> {
    let max = layout.payload_len();
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }

    let start = dst.len();
    dst.reserve(layout.frame_len());
    dst.put_slice(payload);
    dst.put_bytes(PAD, max - payload.len());

    let checksum = Checksum::of(&dst[start..start + max]);
    dst.put_slice(&TAG);
    dst.put_u8(SEPARATOR);
    dst.put_slice(&checksum.to_hex());
    dst.put_slice(counter.as_bytes());
    dst.put_bytes(FILLER, RESERVED_LEN);
    Ok(())
}
