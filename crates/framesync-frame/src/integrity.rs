use std::fmt;

use crate::codec::{Frame, CHECKSUM_LEN};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A CRC-32 value (reflected polynomial, all-ones initial value, final
/// complement).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(u32);

impl Checksum {
    /// Compute the checksum of `data`.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(data);
        Self(hasher.finalize())
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Zero-padded, uppercase, 8-digit hex (`%08X`).
    pub fn to_hex(self) -> [u8; CHECKSUM_LEN] {
        let mut out = [0u8; CHECKSUM_LEN];
        for (i, slot) in out.iter_mut().enumerate() {
            let shift = 28 - 4 * i;
            *slot = HEX_DIGITS[((self.0 >> shift) & 0xF) as usize];
        }
        out
    }
}

impl From<u32> for Checksum {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({self})")
    }
}

/// The footer digits do not match the payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("checksum mismatch (computed {computed}, received {received:?})")]
pub struct ChecksumMismatch {
    pub computed: Checksum,
    pub received: String,
}

/// Check a frame's footer against its payload.
///
/// The comparison is textual: the received digits must be exactly the
/// uppercase `%08X` rendering of the computed value.
pub fn check(frame: &Frame) -> Result<Checksum, ChecksumMismatch> {
    let computed = Checksum::of(frame.payload());
    if computed.to_hex().as_slice() == frame.checksum_hex() {
        Ok(computed)
    } else {
        Err(ChecksumMismatch {
            computed,
            received: String::from_utf8_lossy(frame.checksum_hex()).into_owned(),
        })
    }
}

/// Whether a frame's footer checksum matches its payload.
pub fn verify(frame: &Frame) -> bool {
    check(frame).is_ok()
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, FrameLayout, FOOTER_LEN};
    use crate::dedup::SequenceCounter;

    fn frame_with_payload(payload: &[u8]) -> (Frame, BytesMut) {
        let layout = FrameLayout::new(FOOTER_LEN + payload.len()).unwrap();
        let mut wire = BytesMut::new();
        encode_frame(payload, SequenceCounter::new(*b"0001"), layout, &mut wire).unwrap();
        (Frame::from_window(wire.clone().freeze(), layout).unwrap(), wire)
    }

    #[test]
    fn standard_check_value() {
        assert_eq!(Checksum::of(b"123456789").value(), 0xCBF4_3926);
        assert_eq!(&Checksum::of(b"123456789").to_hex(), b"CBF43926");
    }

    #[test]
    fn hex_matches_printf_formatting() {
        for value in [0u32, 0x1, 0xABC, 0x00FF_00FF, 0xDEAD_BEEF, u32::MAX] {
            let checksum = Checksum::from(value);
            assert_eq!(
                String::from_utf8(checksum.to_hex().to_vec()).unwrap(),
                format!("{value:08X}")
            );
            assert_eq!(checksum.to_string(), format!("{value:08X}"));
        }
    }

    #[test]
    fn valid_frame_verifies() {
        let (frame, _) = frame_with_payload(b"UklGRn7IJA1BVkkg");
        assert!(verify(&frame));
        assert_eq!(check(&frame).unwrap(), Checksum::of(b"UklGRn7IJA1BVkkg"));
    }

    #[test]
    fn corrupted_payload_fails() {
        let (_, mut wire) = frame_with_payload(b"UklGRn7IJA1BVkkg");
        wire[0] = b'V';
        let layout = FrameLayout::new(wire.len()).unwrap();
        let frame = Frame::from_window(wire.freeze(), layout).unwrap();
        assert!(!verify(&frame));
    }

    #[test]
    fn lowercase_digits_are_a_mismatch() {
        let (frame, mut wire) = frame_with_payload(b"QUJD");
        assert_eq!(frame.checksum_hex(), b"43A57986");

        let range = frame.layout().checksum_range();
        wire[range].make_ascii_lowercase();
        let lowered = Frame::from_window(wire.freeze(), frame.layout()).unwrap();

        let err = check(&lowered).unwrap_err();
        assert_eq!(err.computed, Checksum::of(b"QUJD"));
        assert_eq!(err.received, "43a57986");
    }
}
