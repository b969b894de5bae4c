//! Unsigned LEB128 variable-length integers, as used by the multihash header.

use crate::error::MultihashError;

/// Append `value` to `buf` as an unsigned varint.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from the front of `data`. Returns (value, bytes_consumed).
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize), MultihashError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        if shift >= 64 {
            return Err(MultihashError::VarintOverflow);
        }
        let bits = (byte & 0x7F) as u64;
        // The tenth byte may only carry the single remaining bit.
        if shift == 63 && bits > 1 {
            return Err(MultihashError::VarintOverflow);
        }
        value |= bits << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(MultihashError::TruncatedVarint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_codes() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 0x12);
        assert_eq!(buf, vec![0x12]);
        assert_eq!(decode_varint(&buf).unwrap(), (0x12, 1));
    }

    #[test]
    fn two_byte_codes() {
        // md5 (0xd5) and blake2b-256 (0xb220) need continuation bytes.
        let mut buf = Vec::new();
        encode_varint(&mut buf, 0xd5);
        assert_eq!(buf, vec![0xd5, 0x01]);

        let mut buf = Vec::new();
        encode_varint(&mut buf, 0xb220);
        assert_eq!(buf, vec![0xa0, 0xe4, 0x02]);
        assert_eq!(decode_varint(&buf).unwrap(), (0xb220, 3));
    }

    #[test]
    fn zero() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 0);
        assert_eq!(decode_varint(&buf).unwrap(), (0, 1));
    }

    #[test]
    fn max_u64() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), 10);
        let (val, consumed) = decode_varint(&buf).unwrap();
        assert_eq!(val, u64::MAX);
        assert_eq!(consumed, 10);
    }

    #[test]
    fn decode_stops_at_first_terminal_byte() {
        let (val, consumed) = decode_varint(&[0x20, 0xff, 0xff]).unwrap();
        assert_eq!(val, 0x20);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn truncated() {
        assert_eq!(decode_varint(&[0x80]), Err(MultihashError::TruncatedVarint));
        assert_eq!(decode_varint(&[]), Err(MultihashError::TruncatedVarint));
    }

    #[test]
    fn overflow() {
        let too_long = [0xff; 11];
        assert_eq!(decode_varint(&too_long), Err(MultihashError::VarintOverflow));

        let mut tenth_byte_too_big = vec![0xff; 9];
        tenth_byte_too_big.push(0x02);
        assert_eq!(
            decode_varint(&tenth_byte_too_big),
            Err(MultihashError::VarintOverflow)
        );
    }
}
