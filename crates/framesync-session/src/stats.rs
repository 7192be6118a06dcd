use serde::{Deserialize, Serialize};

/// Counters accumulated over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Checksum-valid frames (duplicates included).
    pub frames_accepted: u64,
    /// Frames rejected for a checksum mismatch.
    pub frames_rejected: u64,
    /// Accepted frames whose counter repeated the previous one.
    pub duplicates_suppressed: u64,
    /// Assembly passes abandoned for a control token or missing tag.
    pub resyncs: u64,
    /// Scans that exhausted the retry budget.
    pub sync_timeouts: u64,
    /// Fresh frames whose payload failed to decode.
    pub decode_errors: u64,
    pub payloads_delivered: u64,
    pub payload_bytes: u64,
}
