use bytes::Bytes;

use crate::error::{FrameError, Result};

/// Out-of-band token asking the receiver to drop its state and resynchronize.
pub const IGNORE_TOKEN: [u8; 8] = *b"%IGNORE%";

/// Base64 of a RIFF/AVI header prefix, as sent by the deployed capture source.
pub const DEFAULT_PREAMBLE: &[u8] = b"UklGRn7IJA1BVkkg";

/// Default preamble scan granularity.
pub const DEFAULT_SCAN_WINDOW: usize = 6;

/// Find the left shift `s` such that `window` equals `reference` rotated left
/// by `s` bytes.
pub fn rotation_of(window: &[u8], reference: &[u8]) -> Option<usize> {
    if reference.is_empty() || window.len() != reference.len() {
        return None;
    }
    (0..reference.len()).find(|&shift| {
        let (head, tail) = reference.split_at(shift);
        window[..tail.len()] == *tail && window[tail.len()..] == *head
    })
}

/// Whether `window` is any cyclic rotation of `%IGNORE%`.
pub fn is_control_token(window: &[u8]) -> bool {
    rotation_of(window, &IGNORE_TOKEN).is_some()
}

/// Rolling view over the most recent received bytes, used to spot the control
/// token wherever it falls relative to read boundaries.
#[derive(Debug, Clone, Default)]
pub struct TokenWatch {
    history: [u8; IGNORE_TOKEN.len()],
    filled: usize,
}

impl TokenWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything observed so far.
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    /// Feed received bytes. Returns true if, after any of them, the last
    /// eight bytes formed a rotation of the control token.
    pub fn observe(&mut self, bytes: &[u8]) -> bool {
        let mut seen = false;
        for &byte in bytes {
            seen |= self.push(byte);
        }
        seen
    }

    /// Feed bytes up to and including the first one that completes a control
    /// token, and return how many were consumed. Bytes after that point are
    /// left unobserved. `None` means no token completed and every byte was fed.
    pub fn token_end(&mut self, bytes: &[u8]) -> Option<usize> {
        bytes.iter().position(|&byte| self.push(byte)).map(|at| at + 1)
    }

    fn push(&mut self, byte: u8) -> bool {
        self.history.copy_within(1.., 0);
        self.history[IGNORE_TOKEN.len() - 1] = byte;
        self.filled = (self.filled + 1).min(IGNORE_TOKEN.len());
        self.filled == IGNORE_TOKEN.len() && is_control_token(&self.history)
    }
}

/// The start-of-frame marker and the window size it is scanned with.
///
/// A window matches when it equals `bytes[phase..phase + window]` for some
/// `phase < window`. Whatever offset the preamble starts at relative to the
/// read boundaries, the first window read entirely inside it lands on one of
/// those phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    bytes: Bytes,
    window: usize,
}

impl Preamble {
    pub fn new(bytes: impl Into<Bytes>, window: usize) -> Result<Self> {
        let bytes = bytes.into();
        if window == 0 {
            return Err(FrameError::InvalidPreamble(
                "scan window must be at least one byte".to_string(),
            ));
        }
        let needed = window.saturating_mul(2) - 1;
        if bytes.len() < needed {
            return Err(FrameError::InvalidPreamble(format!(
                "preamble of {} bytes is too short for a {window}-byte scan window (need {needed})",
                bytes.len(),
            )));
        }
        if bytes.windows(IGNORE_TOKEN.len()).any(is_control_token) {
            return Err(FrameError::InvalidPreamble(
                "preamble contains the control token".to_string(),
            ));
        }
        Ok(Self { bytes, window })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// The phase at which `window` matches, if any.
    pub fn phase_of(&self, window: &[u8]) -> Option<usize> {
        if window.len() != self.window {
            return None;
        }
        (0..self.window).find(|&phase| &self.bytes[phase..phase + self.window] == window)
    }

    /// Preamble bytes still to come after a window matched at `phase`.
    pub fn remaining_after(&self, phase: usize) -> usize {
        self.bytes.len() - phase - self.window
    }
}

impl Default for Preamble {
    fn default() -> Self {
        Self {
            bytes: Bytes::from_static(DEFAULT_PREAMBLE),
            window: DEFAULT_SCAN_WINDOW,
        }
    }
}
