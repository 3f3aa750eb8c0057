//! Binary frame, packet and blob codec for the tinylog feed format.
//!
//! This crate owns the wire layer only: parsing and serializing the
//! 128-byte feed header, 128-byte packet frames, 120-byte blob frames, and
//! the seven packet kinds. It has no notion of a file on disk — that lives
//! in `tinylog-core`.

pub mod frame;
pub mod header;
pub mod packet;
pub mod varint;

pub use frame::{FRAME_SIZE, decode_frame, encode_frame};
pub use header::{FEED_HEADER_SIZE, FeedHeader};
pub use packet::{AUTH_LEN, Blob, ChainHead, DMX_LEN, MID_LEN, PAYLOAD_LEN, Packet, PacketKind, WIRE_LEN, create_chain, pkt_from_bytes};
pub use varint::{VarIntError, from_varint, to_varint};
