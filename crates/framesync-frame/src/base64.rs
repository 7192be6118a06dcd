//! Base64 payload decoder.
//!
//! Decodes the standard alphabet in 4-character groups. A newline is skipped,
//! `=` ends the data (anything after it is ignored, so a short payload may be
//! padded out with `=`), and any other byte outside the alphabet is an error.

use bytes::Bytes;

const SKIP: u8 = 64;
const END: u8 = 65;
const INVALID: u8 = 66;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table[b'\n' as usize] = SKIP;
    table[b'=' as usize] = END;
    table
}

/// Errors produced while decoding a base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A byte outside the base64 alphabet was found.
    #[error("invalid base64 byte 0x{byte:02X} at position {position}")]
    InvalidByte { byte: u8, position: usize },

    /// The output buffer cannot hold the decoded bytes.
    #[error("decoded output needs {needed} bytes, capacity is {capacity}")]
    OutputTooSmall { needed: usize, capacity: usize },
}

/// Upper bound on the decoded length of `input_len` base64 characters.
pub fn max_decoded_len(input_len: usize) -> usize {
    input_len / 4 * 3 + 2
}

/// Decode `input` into `out`, returning the number of bytes written.
///
/// A trailing group of 2 characters yields 1 byte, 3 characters yield 2
/// bytes; a single dangling character yields nothing.
pub fn decode_into(input: &[u8], out: &mut [u8]) -> Result<usize, DecodeError> {
    let mut acc: u32 = 0;
    let mut sextets = 0u8;
    let mut len = 0usize;

    for (position, &byte) in input.iter().enumerate() {
        match TABLE[byte as usize] {
            SKIP => continue,
            END => break,
            INVALID => return Err(DecodeError::InvalidByte { byte, position }),
            value => {
                acc = (acc << 6) | u32::from(value);
                sextets += 1;
                if sextets == 4 {
                    emit(out, &mut len, &[(acc >> 16) as u8, (acc >> 8) as u8, acc as u8])?;
                    acc = 0;
                    sextets = 0;
                }
            }
        }
    }

    match sextets {
        3 => emit(out, &mut len, &[(acc >> 10) as u8, (acc >> 2) as u8])?,
        2 => emit(out, &mut len, &[(acc >> 4) as u8])?,
        _ => {}
    }

    Ok(len)
}

/// Decode `input` into a freshly allocated buffer of the exact decoded length.
pub fn decode(input: &[u8]) -> Result<Bytes, DecodeError> {
    let mut out = vec![0u8; max_decoded_len(input.len())];
    let len = decode_into(input, &mut out)?;
    out.truncate(len);
    Ok(Bytes::from(out))
}

fn emit(out: &mut [u8], len: &mut usize, bytes: &[u8]) -> Result<(), DecodeError> {
    let end = *len + bytes.len();
    if end > out.len() {
        return Err(DecodeError::OutputTooSmall {
            needed: end,
            capacity: out.len(),
        });
    }
    out[*len..end].copy_from_slice(bytes);
    *len = end;
    Ok(())
}
