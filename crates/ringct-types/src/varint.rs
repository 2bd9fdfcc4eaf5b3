//! CryptoNote varints: little-endian base-128, high bit marks continuation.

use crate::error::DecodeError;

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

pub fn write_varint(out: &mut Vec<u8>, mut val: u64) {
    while val >= 0x80 {
        out.push((val as u8 & 0x7f) | 0x80);
        val >>= 7;
    }
    out.push(val as u8);
}

pub fn encode_varint(val: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    write_varint(&mut out, val);
    out
}

/// Decode a varint starting at `offset`. Returns `(value, bytes_read)`.
///
/// Rejects overlong encodings (a trailing zero group) and values past 64 bits.
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in data.get(offset..).unwrap_or_default().iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            break;
        }
        let group = (byte & 0x7f) as u64;
        if shift == 63 && group > 1 {
            return Err(DecodeError::Varint(offset));
        }
        value |= group << shift;
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(DecodeError::Varint(offset));
            }
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(DecodeError::Varint(offset))
}
