//! Feed file header: the fixed 128-byte struct occupying frame 0 of every
//! `.log` file.
//!
//! All multi-byte integers are big-endian network byte order. Fields are
//! raw byte arrays rather than native integers to avoid alignment padding
//! inside the `repr(C, packed)` layout and to make the zero-copy cast from
//! untrusted file bytes total (every 128-byte pattern is a valid header).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size of the on-disk feed header, in bytes.
pub const FEED_HEADER_SIZE: usize = 128;

/// Fixed 128-byte feed header (big-endian).
///
/// Layout (offsets relative to start of file):
/// `12B reserved, 32B fid, 32B parent_id, 4B parent_seq, 4B anchor_seq,
/// 20B anchor_mid, 4B front_seq, 20B front_mid`.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, PartialEq, Eq, Debug)]
pub struct FeedHeader {
    reserved: [u8; 12],
    fid: [u8; 32],
    parent_id: [u8; 32],
    parent_seq: [u8; 4],
    anchor_seq: [u8; 4],
    anchor_mid: [u8; 20],
    front_seq: [u8; 4],
    front_mid: [u8; 20],
}

impl FeedHeader {
    /// Builds a fresh header for a new feed rooted at `fid` with no parent.
    #[must_use]
    pub fn new_root(fid: [u8; 32]) -> Self {
        Self {
            reserved: [0; 12],
            fid,
            parent_id: [0; 32],
            parent_seq: [0; 4],
            anchor_seq: [0; 4],
            anchor_mid: fid_anchor_mid(&fid),
            front_seq: [0; 4],
            front_mid: fid_anchor_mid(&fid),
        }
    }

    /// Builds a fresh header for a new feed rooted at `fid`, recording
    /// `parent_id`/`parent_seq` as the feed that referenced it into
    /// existence (spec.md §3's header-level parent link, distinct from the
    /// in-band `ischild` packet `Feed::get_parent` reads at sequence 1).
    #[must_use]
    pub fn new_child(fid: [u8; 32], parent_id: [u8; 32], parent_seq: u32) -> Self {
        Self { parent_id, parent_seq: parent_seq.to_be_bytes(), ..Self::new_root(fid) }
    }

    /// Parses a header from exactly [`FEED_HEADER_SIZE`] bytes.
    ///
    /// Returns `None` if `bytes` is not exactly the header size; all byte
    /// patterns of the right length parse successfully (no magic/version
    /// check — the feed format carries no such marker in spec.md's layout).
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes).ok()
    }

    /// Serializes the header back to its 128-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FEED_HEADER_SIZE] {
        let mut out = [0u8; FEED_HEADER_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// This feed's own identifier.
    #[must_use]
    pub fn fid(&self) -> [u8; 32] {
        self.fid
    }

    /// The parent feed's identifier, or all-zero if this feed has no parent.
    #[must_use]
    pub fn parent_id(&self) -> [u8; 32] {
        self.parent_id
    }

    /// Sequence at which the parent feed referenced this one.
    #[must_use]
    pub fn parent_seq(&self) -> u32 {
        u32::from_be_bytes(self.parent_seq)
    }

    /// Base sequence; the first in-file packet lives at `anchor_seq + 1`.
    #[must_use]
    pub fn anchor_seq(&self) -> u32 {
        u32::from_be_bytes(self.anchor_seq)
    }

    /// Message-ID chaining anchor for sequence `anchor_seq`.
    #[must_use]
    pub fn anchor_mid(&self) -> [u8; 20] {
        self.anchor_mid
    }

    /// Highest sequence number currently stored.
    #[must_use]
    pub fn front_seq(&self) -> u32 {
        u32::from_be_bytes(self.front_seq)
    }

    /// Message-ID of the frame at `front_seq`.
    #[must_use]
    pub fn front_mid(&self) -> [u8; 20] {
        self.front_mid
    }

    /// Returns a copy of this header with `front_seq`/`front_mid` updated.
    ///
    /// Used by the header-rewrite seam after an append; never mutates any
    /// other field.
    #[must_use]
    pub fn with_front(mut self, front_seq: u32, front_mid: [u8; 20]) -> Self {
        self.front_seq = front_seq.to_be_bytes();
        self.front_mid = front_mid;
        self
    }
}

/// Deterministic placeholder anchor mid for a freshly created root feed.
///
/// spec.md treats message IDs as opaque tags; a root feed's anchor mid has
/// no preceding packet to derive from, so it is seeded from the feed's own
/// id (mirrors `mids[0] = fid[:20]` in `original_source/src/feed.py`).
fn fid_anchor_mid(fid: &[u8; 32]) -> [u8; 20] {
    let mut mid = [0u8; 20];
    mid.copy_from_slice(&fid[..20]);
    mid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_128() {
        assert_eq!(std::mem::size_of::<FeedHeader>(), FEED_HEADER_SIZE);
    }

    #[test]
    fn round_trips_through_bytes() {
        let header = FeedHeader::new_root([7u8; 32]).with_front(3, [9u8; 20]);
        let bytes = header.to_bytes();
        let parsed = FeedHeader::from_bytes(&bytes).expect("parses");
        assert_eq!(parsed, header);
        assert_eq!(parsed.front_seq(), 3);
        assert_eq!(parsed.front_mid(), [9u8; 20]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(FeedHeader::from_bytes(&[0u8; 100]).is_none());
    }
}
