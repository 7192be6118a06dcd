//! Sender-side stream builder.
//!
//! Produces the byte stream a receiver configured with the same layout,
//! preamble and sync mode accepts: the data is base64-encoded, split across
//! frames, and each frame is followed by the trailer slack the receiver reads
//! while confirming the tag.

use ::base64::engine::general_purpose::STANDARD;
use ::base64::Engine;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::assembler::{DEFAULT_FILL_CHUNK, DEFAULT_TAG_CONFIRMATIONS};
use crate::codec::{encode_frame, FrameLayout, FILLER, FOOTER_LEN};
use crate::dedup::SequenceCounter;
use crate::error::{FrameError, Result};
use crate::marker::{Preamble, IGNORE_TOKEN};
use crate::scanner::SyncMode;

#[derive(Debug, Clone)]
pub struct StreamEncoder {
    layout: FrameLayout,
    preamble: Preamble,
    mode: SyncMode,
    slack: usize,
    ignore_prefix: bool,
}

impl StreamEncoder {
    pub fn new(layout: FrameLayout, preamble: Preamble, mode: SyncMode) -> Self {
        Self {
            layout,
            preamble,
            mode,
            slack: (DEFAULT_TAG_CONFIRMATIONS - 1) * DEFAULT_FILL_CHUNK,
            ignore_prefix: false,
        }
    }

    /// Filler bytes emitted after each frame. Must equal
    /// `(confirmations - 1) * fill_chunk` of the receiver.
    pub fn with_slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    /// Open the stream with the `%IGNORE%` control token.
    pub fn with_ignore_prefix(mut self, ignore_prefix: bool) -> Self {
        self.ignore_prefix = ignore_prefix;
        self
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Base64 characters carried per frame. Always a multiple of four so every
    /// frame decodes on its own.
    pub fn chunk_len(&self) -> usize {
        self.layout.payload_len() / 4 * 4
    }

    /// Frames needed to carry `data_len` bytes.
    pub fn frame_count(&self, data_len: usize) -> usize {
        match self.chunk_len() {
            0 => 0,
            chunk_len => (data_len.div_ceil(3) * 4).div_ceil(chunk_len),
        }
    }

    /// Encode `data` into a complete stream.
    ///
    /// The base64 text of `data` has to open with the preamble: the first
    /// frame carries it, and the receiver seeds that frame with the preamble
    /// bytes it consumed while synchronizing.
    pub fn encode(&self, data: &[u8]) -> Result<Bytes> {
        let chunk_len = self.chunk_len();
        if chunk_len == 0 {
            return Err(FrameError::InvalidLayout {
                frame_len: self.layout.frame_len(),
                footer_len: FOOTER_LEN,
            });
        }

        let text = STANDARD.encode(data);
        if !text.as_bytes().starts_with(self.preamble.as_bytes()) {
            return Err(FrameError::InvalidPreamble(format!(
                "encoded data does not start with {:?}",
                String::from_utf8_lossy(self.preamble.as_bytes())
            )));
        }

        let frames = self.frame_count(data.len());
        let mut out = BytesMut::with_capacity(
            frames * (self.layout.frame_len() + self.slack + self.preamble.len())
                + IGNORE_TOKEN.len(),
        );
        if self.ignore_prefix {
            out.put_slice(&IGNORE_TOKEN);
        }

        for (index, chunk) in text.as_bytes().chunks(chunk_len).enumerate() {
            if index > 0 && self.mode == SyncMode::PerFrame {
                out.put_slice(self.preamble.as_bytes());
            }
            let counter = SequenceCounter::from_index(index as u32 + 1);
            encode_frame(chunk, counter, self.layout, &mut out)?;
            out.put_bytes(FILLER, self.slack);
        }

        debug!(
            input = data.len(),
            frames,
            bytes = out.len(),
            mode = ?self.mode,
            "stream encoded"
        );
        Ok(out.freeze())
    }
}
