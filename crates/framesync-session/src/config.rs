use bytes::Bytes;
use framesync_frame::{
    FrameLayout, Preamble, SyncMode, DEFAULT_FILL_CHUNK, DEFAULT_FRAME_LEN, DEFAULT_PREAMBLE,
    DEFAULT_RETRY_BUDGET, DEFAULT_SCAN_WINDOW, DEFAULT_TAG_CONFIRMATIONS, FOOTER_LEN,
};

use crate::error::{Result, SessionError};

/// Receive-side session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Start-of-frame marker (base64 text of the payload's magic header).
    pub preamble: Bytes,
    /// Bytes per preamble scan window.
    pub scan_window: usize,
    /// Maximum bytes requested per read while filling a frame.
    pub fill_chunk: usize,
    /// Non-matching scan windows tolerated before a sync timeout.
    pub retry_budget: usize,
    /// Fill cycles that must see the trailer tag before a frame is accepted.
    pub tag_confirmations: usize,
    /// Total frame length, footer included.
    pub frame_len: usize,
    /// Whether every frame is preceded by the preamble.
    pub sync_mode: SyncMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preamble: Bytes::from_static(DEFAULT_PREAMBLE),
            scan_window: DEFAULT_SCAN_WINDOW,
            fill_chunk: DEFAULT_FILL_CHUNK,
            retry_budget: DEFAULT_RETRY_BUDGET,
            tag_confirmations: DEFAULT_TAG_CONFIRMATIONS,
            frame_len: DEFAULT_FRAME_LEN,
            sync_mode: SyncMode::default(),
        }
    }
}

impl SessionConfig {
    /// Check every field. Called by `Session::new`.
    pub fn validate(&self) -> Result<()> {
        if self.scan_window == 0 {
            return invalid("scan_window must be greater than zero");
        }
        if self.preamble.is_empty() {
            return invalid("preamble must not be empty");
        }
        let needed = self.scan_window.saturating_mul(2) - 1;
        if self.preamble.len() < needed {
            return invalid(format!(
                "preamble of {} bytes is too short for a {}-byte scan window (need at least {needed})",
                self.preamble.len(),
                self.scan_window,
            ));
        }
        if self.fill_chunk == 0 {
            return invalid("fill_chunk must be greater than zero");
        }
        if self.retry_budget == 0 {
            return invalid("retry_budget must be greater than zero");
        }
        if self.tag_confirmations == 0 {
            return invalid("tag_confirmations must be at least 1");
        }
        if self.frame_len <= FOOTER_LEN {
            return invalid(format!(
                "frame_len {} must exceed the {FOOTER_LEN}-byte footer",
                self.frame_len
            ));
        }
        if self.preamble.len() > self.frame_len - FOOTER_LEN {
            return invalid(format!(
                "preamble of {} bytes does not fit the {}-byte payload region",
                self.preamble.len(),
                self.frame_len - FOOTER_LEN
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> Result<FrameLayout> {
        Ok(FrameLayout::new(self.frame_len)?)
    }

    pub fn build_preamble(&self) -> Result<Preamble> {
        Preamble::new(self.preamble.clone(), self.scan_window)
            .map_err(|err| SessionError::InvalidConfig(err.to_string()))
    }

    /// Trailer slack the sender must emit after each frame for this
    /// configuration.
    pub fn trailer_slack(&self) -> usize {
        self.tag_confirmations
            .saturating_sub(1)
            .saturating_mul(self.fill_chunk)
    }
}

fn invalid(reason: impl Into<String>) -> Result<()> {
    Err(SessionError::InvalidConfig(reason.into()))
}
