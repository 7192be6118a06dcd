use std::fmt;

use bytes::{Bytes, BytesMut};
use framesync_transport::ByteTransport;
use tracing::{debug, trace};

use crate::codec::{Frame, FrameLayout, FILLER};
use crate::error::Result;
use crate::marker::TokenWatch;
use crate::reader::{read_chunk, read_window};

/// Default read granularity while filling a frame.
pub const DEFAULT_FILL_CHUNK: usize = 8;

/// Default number of consecutive fill cycles that must see the tag.
pub const DEFAULT_TAG_CONFIRMATIONS: usize = 3;

/// Why an assembly pass was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// The sender emitted the `%IGNORE%` control token.
    ControlToken,
    /// The window filled up without a `CRC` tag in the footer.
    InvalidTag,
}

impl fmt::Display for ResyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResyncReason::ControlToken => f.write_str("control token"),
            ResyncReason::InvalidTag => f.write_str("invalid trailer tag"),
        }
    }
}

/// Outcome of one assembly pass.
///
/// A transport that closes mid-frame is reported through the `Err` side of
/// [`FrameAssembler::fill`] rather than as a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameState {
    /// A full window with a confirmed tag.
    Complete(Frame),
    /// The partial frame was dropped; synchronization must be re-acquired.
    Resynced(ResyncReason),
}

/// Fills a fixed-length frame window from small transport reads.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    layout: FrameLayout,
    chunk: usize,
    confirmations: usize,
    watch: TokenWatch,
    leftover: BytesMut,
}

impl FrameAssembler {
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            chunk: DEFAULT_FILL_CHUNK,
            confirmations: DEFAULT_TAG_CONFIRMATIONS,
            watch: TokenWatch::new(),
            leftover: BytesMut::new(),
        }
    }

    /// Set the maximum number of bytes requested per read.
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    /// Set how many fill cycles must see the tag before the frame is
    /// accepted. `1` accepts on first sight.
    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations
    }

    /// Bytes that arrived in the same read as a control token, after it.
    /// They belong to whatever the sender transmits next and must be scanned
    /// before reading the link again.
    pub fn take_leftover(&mut self) -> Bytes {
        self.leftover.split().freeze()
    }

    /// Fill one frame window.
    ///
    /// `seed` holds bytes already consumed from the stream that belong at the
    /// start of the window (the preamble, for the first frame of a session).
    /// Reads never run past the window. Once the window is full and tagged,
    /// each remaining confirmation consumes one chunk of trailer slack; a
    /// control token anywhere in the bytes read aborts the frame, and the
    /// bytes after it are kept for [`take_leftover`](Self::take_leftover).
    pub fn fill<T: ByteTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        seed: Option<&[u8]>,
    ) -> Result<FrameState> {
        let frame_len = self.layout.frame_len();
        let mut window = BytesMut::with_capacity(frame_len);
        window.resize(frame_len, FILLER);

        let mut offset = 0usize;
        if let Some(seed) = seed {
            let n = seed.len().min(frame_len);
            window[..n].copy_from_slice(&seed[..n]);
            offset = n;
        }

        self.watch.clear();
        self.leftover.clear();
        let mut chunk = vec![0u8; self.chunk];

        while offset < frame_len {
            let want = self.chunk.min(frame_len - offset);
            let n = read_chunk(transport, &mut chunk[..want])?;
            if n == 0 {
                continue;
            }
            if let Some(end) = self.watch.token_end(&chunk[..n]) {
                debug!(offset, carried = n - end, "control token during assembly");
                self.leftover.extend_from_slice(&chunk[end..n]);
                return Ok(FrameState::Resynced(ResyncReason::ControlToken));
            }
            window[offset..offset + n].copy_from_slice(&chunk[..n]);
            offset += n;
        }

        let frame = Frame::from_window(window.freeze(), self.layout)?;
        if !frame.has_valid_tag() {
            debug!(tag = ?frame.tag(), "trailer tag missing");
            return Ok(FrameState::Resynced(ResyncReason::InvalidTag));
        }

        for confirmation in 2..=self.confirmations {
            read_window(transport, &mut chunk)?;
            if let Some(end) = self.watch.token_end(&chunk) {
                debug!(confirmation, "control token in trailer slack");
                self.leftover.extend_from_slice(&chunk[end..]);
                return Ok(FrameState::Resynced(ResyncReason::ControlToken));
            }
            trace!(confirmation, "trailer tag confirmed");
        }

        Ok(FrameState::Complete(frame))
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};
    use framesync_transport::MemoryTransport;

    use super::*;
    use crate::codec::{encode_frame, FOOTER_LEN};
    use crate::dedup::SequenceCounter;
    use crate::integrity::verify;
    use crate::marker::IGNORE_TOKEN;

    fn small_layout() -> FrameLayout {
        FrameLayout::new(FOOTER_LEN + 16).unwrap()
    }

    fn wire_frame(payload: &[u8], counter: &[u8; 4]) -> BytesMut {
        let mut wire = BytesMut::new();
        encode_frame(payload, SequenceCounter::new(*counter), small_layout(), &mut wire).unwrap();
        wire
    }

    #[test]
    fn fills_frame_from_partial_reads() {
        let wire = wire_frame(b"UklGRn7IJA1BVkkg", b"0001");
        let mut transport = MemoryTransport::new(wire.freeze()).with_max_read(3);
        let mut assembler = FrameAssembler::new(small_layout()).with_confirmations(1);

        let state = assembler.fill(&mut transport, None).unwrap();
        let FrameState::Complete(frame) = state else {
            panic!("expected a complete frame, got {state:?}");
        };
        assert!(verify(&frame));
        assert_eq!(frame.counter(), SequenceCounter::new(*b"0001"));
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn seed_occupies_start_of_window() {
        let mut wire = wire_frame(b"UklGRn7IJA1BVkkg", b"0001");
        let mut transport = MemoryTransport::new(wire.split_off(16).freeze());
        let mut assembler = FrameAssembler::new(small_layout()).with_confirmations(1);

        let state = assembler.fill(&mut transport, Some(b"UklGRn7IJA1BVkkg")).unwrap();
        let FrameState::Complete(frame) = state else {
            panic!("expected a complete frame, got {state:?}");
        };
        assert_eq!(frame.payload(), b"UklGRn7IJA1BVkkg");
        assert!(verify(&frame));
    }

    #[test]
    fn reads_never_overrun_the_window() {
        let mut stream = wire_frame(b"QUJDQUJDQUJDQUJD", b"0001");
        stream.extend_from_slice(b"NEXTFRAME");
        let mut transport = MemoryTransport::new(stream.freeze());
        let mut assembler = FrameAssembler::new(small_layout())
            .with_chunk(7)
            .with_confirmations(1);

        assert!(matches!(
            assembler.fill(&mut transport, None).unwrap(),
            FrameState::Complete(_)
        ));
        assert_eq!(transport.remaining(), 9);
    }

    #[test]
    fn missing_tag_resyncs() {
        let mut wire = wire_frame(b"QUJDQUJDQUJDQUJD", b"0001");
        wire[16] = b'X';
        let mut transport = MemoryTransport::new(wire.freeze());
        let mut assembler = FrameAssembler::new(small_layout()).with_confirmations(1);

        assert_eq!(
            assembler.fill(&mut transport, None).unwrap(),
            FrameState::Resynced(ResyncReason::InvalidTag)
        );
    }

    #[test]
    fn control_token_at_any_offset_aborts() {
        let layout = small_layout();
        let wire = wire_frame(b"QUJDQUJDQUJDQUJD", b"0001");
        for at in 0..=layout.frame_len() - IGNORE_TOKEN.len() {
            let mut stream = BytesMut::from(&wire[..at]);
            stream.extend_from_slice(&IGNORE_TOKEN);
            stream.extend_from_slice(&wire);
            let mut transport = MemoryTransport::new(stream.freeze()).with_max_read(5);
            let mut assembler = FrameAssembler::new(layout).with_confirmations(1);

            assert_eq!(
                assembler.fill(&mut transport, None).unwrap(),
                FrameState::Resynced(ResyncReason::ControlToken),
                "token at offset {at}"
            );
        }
    }

    #[test]
    fn bytes_after_the_token_are_kept() {
        let wire = wire_frame(b"QUJDQUJDQUJDQUJD", b"0001");
        for cut in 1..8 {
            let mut stream = BytesMut::from(&wire[..cut]);
            stream.extend_from_slice(&IGNORE_TOKEN);
            stream.extend_from_slice(&wire);
            let mut transport = MemoryTransport::new(stream.freeze()).with_max_read(8);
            let mut assembler = FrameAssembler::new(small_layout()).with_confirmations(1);

            assert_eq!(
                assembler.fill(&mut transport, None).unwrap(),
                FrameState::Resynced(ResyncReason::ControlToken),
                "cut at {cut}"
            );
            let leftover = assembler.take_leftover();
            assert_eq!(leftover.as_ref(), &wire[..8 - cut], "cut at {cut}");
            assert_eq!(transport.remaining(), wire.len() - (8 - cut), "cut at {cut}");
            assert!(assembler.take_leftover().is_empty());
        }
    }

    #[test]
    fn confirmations_consume_trailer_slack() {
        let mut stream = wire_frame(b"QUJDQUJDQUJDQUJD", b"0001");
        stream.extend_from_slice(&[FILLER; 16]);
        stream.extend_from_slice(b"NEXT");
        let mut transport = MemoryTransport::new(stream.freeze()).with_max_read(5);
        let mut assembler = FrameAssembler::new(small_layout());

        assert_eq!(assembler.confirmations(), DEFAULT_TAG_CONFIRMATIONS);
        assert!(matches!(
            assembler.fill(&mut transport, None).unwrap(),
            FrameState::Complete(_)
        ));
        assert_eq!(transport.remaining(), 4);
    }

    #[test]
    fn control_token_in_slack_aborts() {
        let mut stream = wire_frame(b"QUJDQUJDQUJDQUJD", b"0001");
        stream.extend_from_slice(b"--------%IGNORE%");
        let mut transport = MemoryTransport::new(stream.freeze());
        let mut assembler = FrameAssembler::new(small_layout());

        assert_eq!(
            assembler.fill(&mut transport, None).unwrap(),
            FrameState::Resynced(ResyncReason::ControlToken)
        );
    }

    #[test]
    fn closed_mid_frame_is_an_error() {
        let wire = wire_frame(b"QUJDQUJDQUJDQUJD", b"0001");
        let mut transport = MemoryTransport::new(wire.freeze().slice(..20));
        let mut assembler = FrameAssembler::new(small_layout());

        let err = assembler.fill(&mut transport, None).unwrap_err();
        assert!(err.is_closed());
    }
}
