//! LEB128 variable-length integer codec.
//!
//! Used for the `chain20` payload's size prefix and for line numbers in
//! encoded diffs. Each byte carries 7 value bits, least-significant group
//! first; the top bit marks "more bytes follow".

/// Encodes `value` as a LEB128 varint.
#[must_use]
pub fn to_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
    out
}

/// Errors produced while decoding a varint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarIntError {
    /// The buffer ended before a terminating byte (top bit clear) was seen.
    #[error("truncated varint")]
    Truncated,
}

/// Decodes a LEB128 varint from the front of `bytes`.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn from_varint(bytes: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (consumed, &byte) in bytes.iter().enumerate() {
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, consumed + 1));
        }
        shift += 7;
    }
    Err(VarIntError::Truncated)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn round_trips_small_values() {
        for v in [0u64, 1, 127, 128, 255, 300, 16384, u32::MAX as u64] {
            let encoded = to_varint(v);
            let (decoded, consumed) = from_varint(&encoded).expect("decodes");
            assert_eq!(decoded, v);
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn truncated_buffer_errors() {
        let encoded = to_varint(16384);
        assert_eq!(from_varint(&encoded[..1]), Err(VarIntError::Truncated));
    }

    proptest! {
        #[test]
        fn round_trip_any_u32(v in any::<u32>()) {
            let encoded = to_varint(u64::from(v));
            let (decoded, consumed) = from_varint(&encoded).expect("decodes");
            prop_assert_eq!(decoded, u64::from(v));
            prop_assert_eq!(consumed, encoded.len());
        }
    }
}
