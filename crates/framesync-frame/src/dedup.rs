use std::fmt;

use crate::codec::{Frame, COUNTER_LEN};

/// The per-frame sequence counter carried in the footer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceCounter([u8; COUNTER_LEN]);

impl SequenceCounter {
    pub const fn new(bytes: [u8; COUNTER_LEN]) -> Self {
        Self(bytes)
    }

    /// Four ASCII decimal digits, wrapping at 10000.
    pub fn from_index(index: u32) -> Self {
        let mut bytes = [b'0'; COUNTER_LEN];
        let mut rest = index % 10_000;
        for slot in bytes.iter_mut().rev() {
            *slot = b'0' + (rest % 10) as u8;
            rest /= 10;
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; COUNTER_LEN] {
        &self.0
    }
}

impl fmt::Display for SequenceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for SequenceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SequenceCounter({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// Suppresses re-delivery of a frame whose counter equals the previous one.
///
/// A sender that misses an OK acknowledgement retransmits the same frame;
/// the retransmission is acknowledged again but its payload is not handed to
/// the consumer twice.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    last: Option<SequenceCounter>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `frame` repeats the last recorded counter. The first frame is
    /// never a duplicate.
    pub fn is_duplicate(&self, frame: &Frame) -> bool {
        self.last == Some(frame.counter())
    }

    /// Remember `counter` as the last accepted one.
    pub fn record(&mut self, counter: SequenceCounter) {
        self.last = Some(counter);
    }

    /// Record the frame's counter and report whether it was fresh.
    pub fn admit(&mut self, frame: &Frame) -> bool {
        let fresh = !self.is_duplicate(frame);
        self.record(frame.counter());
        fresh
    }

    pub fn last(&self) -> Option<SequenceCounter> {
        self.last
    }
}
