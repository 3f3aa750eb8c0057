//! The 128-byte on-disk frame slot: an 8-byte reserved prefix followed by a
//! packet's 120-byte wire form. Frame 0 of a feed file is the
//! [`crate::header::FeedHeader`] instead; every frame from 1 onward has
//! this shape.

use crate::packet::WIRE_LEN;

/// Size of one on-disk frame slot.
pub const FRAME_SIZE: usize = 8 + WIRE_LEN;

/// Builds a full 128-byte frame from a packet's wire bytes, zeroing the
/// reserved prefix as spec.md §4.1 requires on append.
#[must_use]
pub fn encode_frame(wire: &[u8; WIRE_LEN]) -> [u8; FRAME_SIZE] {
    let mut out = [0u8; FRAME_SIZE];
    out[8..].copy_from_slice(wire);
    out
}

/// Strips the 8-byte reserved prefix off a 128-byte frame, returning the
/// packet wire bytes handed to [`crate::packet::pkt_from_bytes`].
#[must_use]
pub fn decode_frame(frame: &[u8; FRAME_SIZE]) -> [u8; WIRE_LEN] {
    let mut wire = [0u8; WIRE_LEN];
    wire.copy_from_slice(&frame[8..]);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_matches_spec() {
        assert_eq!(FRAME_SIZE, 128);
    }

    #[test]
    fn round_trips_wire_bytes() {
        let wire = [42u8; WIRE_LEN];
        let frame = encode_frame(&wire);
        assert_eq!(&frame[..8], &[0u8; 8]);
        assert_eq!(decode_frame(&frame), wire);
    }
}
