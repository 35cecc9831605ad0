//! Variable-length integer encoding for section lengths: width is chosen
//! from a fixed tag byte, not a continuation-bit scheme.

use crate::error::VarIntError;

/// Encode a non-negative length `l` (`l >= 1`) per the fixed tag-byte width
/// table: 0..=251 direct, 252/253/254/255 select 1/2/4/8 extra bytes.
pub fn encode_varint(l: u64) -> Vec<u8> {
    if l == 0 {
        return vec![0];
    }
    if l <= 252 {
        vec![(l - 1) as u8]
    } else if l <= 508 {
        vec![252, (l - 253) as u8]
    } else if l <= 65535 {
        let mut buf = vec![253u8];
        buf.extend_from_slice(&(l as u16).to_be_bytes());
        buf
    } else if l <= u32::MAX as u64 {
        let mut buf = vec![254u8];
        buf.extend_from_slice(&(l as u32).to_be_bytes());
        buf
    } else {
        let mut buf = vec![255u8];
        buf.extend_from_slice(&l.to_be_bytes());
        buf
    }
}

/// Decoded byte-length for `l`, without allocating.
pub fn sizeof_varint(l: u64) -> usize {
    if l <= 252 {
        1
    } else if l <= 508 {
        2
    } else if l <= 65535 {
        3
    } else if l <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Decode a varint from the front of `data`. Returns `(value, bytes
/// consumed)`.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let tag = *data.first().ok_or(VarIntError::Underflow)?;
    match tag {
        0..=251 => Ok((tag as u64 + 1, 1)),
        252 => {
            let b = *data.get(1).ok_or(VarIntError::Underflow)?;
            Ok((253 + b as u64, 2))
        }
        253 => {
            let bytes = data.get(1..3).ok_or(VarIntError::Underflow)?;
            let v = u16::from_be_bytes([bytes[0], bytes[1]]);
            Ok((v as u64, 3))
        }
        254 => {
            let bytes = data.get(1..5).ok_or(VarIntError::Underflow)?;
            let v = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Ok((v as u64, 5))
        }
        255 => {
            let bytes = data.get(1..9).ok_or(VarIntError::Underflow)?;
            let v = u64::from_be_bytes(bytes.try_into().unwrap());
            Ok((v, 9))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_boundaries() {
        let cases: &[u64] = &[
            1,
            252,
            253,
            508,
            509,
            65535,
            65536,
            u32::MAX as u64 - 1,
            u32::MAX as u64,
            u32::MAX as u64 + 1,
            u64::MAX,
        ];
        for &l in cases {
            let encoded = encode_varint(l);
            assert_eq!(encoded.len(), sizeof_varint(l), "sizeof mismatch for {l}");
            let (decoded, consumed) = decode_varint(&encoded).unwrap();
            assert_eq!(decoded, l, "roundtrip failed for {l}");
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn width_at_exact_boundaries() {
        assert_eq!(encode_varint(252).len(), 1);
        assert_eq!(encode_varint(253).len(), 2);
        assert_eq!(encode_varint(508).len(), 2);
        assert_eq!(encode_varint(509).len(), 3);
        assert_eq!(encode_varint(65535).len(), 3);
        assert_eq!(encode_varint(65536).len(), 5);
        assert_eq!(encode_varint(u32::MAX as u64).len(), 5);
        assert_eq!(encode_varint(u32::MAX as u64 + 1).len(), 9);
    }

    #[test]
    fn underflow_on_truncated_input() {
        assert_eq!(decode_varint(&[252]), Err(VarIntError::Underflow));
        assert_eq!(decode_varint(&[253, 0]), Err(VarIntError::Underflow));
        assert_eq!(decode_varint(&[]), Err(VarIntError::Underflow));
    }
}
