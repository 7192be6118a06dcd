//! Literal byte strings the receiver writes back to the sender.

use framesync_frame::Checksum;

/// Written at session start and after every acknowledgement.
pub const READY: &[u8; 7] = b"%READY%";

/// Length of both acknowledgement tokens.
pub const ACK_LEN: usize = 18;

/// Rejection: sync timeout, resync or checksum mismatch.
pub const ERROR_ACK: &[u8; ACK_LEN] = b"00000000 CRC ERROR";

const OK_SUFFIX: &[u8] = b" CRC OK!!!";

/// Acceptance token carrying the computed checksum, e.g. `"CBF43926 CRC OK!!!"`.
pub fn ok_ack(checksum: Checksum) -> [u8; ACK_LEN] {
    let mut token = [0u8; ACK_LEN];
    let hex = checksum.to_hex();
    token[..hex.len()].copy_from_slice(&hex);
    token[hex.len()..].copy_from_slice(OK_SUFFIX);
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_ack_layout() {
        assert_eq!(&ok_ack(Checksum::from(0xCBF4_3926)), b"CBF43926 CRC OK!!!");
        assert_eq!(&ok_ack(Checksum::from(0x1A)), b"0000001A CRC OK!!!");
    }
}
