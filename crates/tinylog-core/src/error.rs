//! Error types for the feed store.
//!
//! One closed enum for every failure mode spec.md §7 names, rather than a
//! stringly-typed catch-all — callers match on the kind they care about
//! (c.f. the teacher's `StorageError`/`ConnectionError` convention).

use thiserror::Error;

/// Errors produced by feed and blob-store operations.
#[derive(Error, Debug)]
pub enum Error {
    /// `Feed::get` was asked for a sequence outside `(anchor_seq, front_seq]`.
    #[error("sequence {seq} out of range ({anchor_seq}, {front_seq}]")]
    OutOfRange {
        /// The sequence that was requested.
        seq: i64,
        /// The feed's anchor sequence (exclusive lower bound).
        anchor_seq: u32,
        /// The feed's front sequence (inclusive upper bound).
        front_seq: u32,
    },

    /// Append was attempted on a feed already terminated by a `contdas`
    /// packet.
    #[error("feed has ended, cannot append")]
    Ended,

    /// A blob with the given signature was not found in the blob store.
    #[error("blob not found: {signature}")]
    NotFound {
        /// Lowercase hex of the missing blob's signature.
        signature: String,
    },

    /// A blob chain's pointer did not match the next blob's signature.
    #[error("blob chain pointer mismatch")]
    ChainInvalid,

    /// The feed header failed to parse, its file size disagreed with
    /// `front_seq`/`anchor_seq`, or the rebuilt mid chain did not match the
    /// stored `front_mid`.
    #[error("feed header invalid: {reason}")]
    HeaderInvalid {
        /// Human-readable description of what failed to line up.
        reason: String,
    },

    /// The `FeedManager`'s parent-chain walk exceeded the defense-in-depth
    /// hop bound (spec.md §9).
    #[error("parent chain exceeded maximum hop count")]
    ParentChainTooLong,

    /// A lookup in a `FeedManager` implementation found no feed for the
    /// requested id.
    #[error("no feed registered for id {0:02x?}")]
    UnknownFeed([u8; 32]),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
