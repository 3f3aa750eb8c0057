//! Packet codec: the seven tagged kinds a feed frame can carry, their
//! per-kind payload accessors, and the opaque message-ID derivation that
//! chains one packet to the next.
//!
//! spec.md §1 treats the packet constructor/verifier as an external
//! collaborator specified only by its outputs. This workspace owns no
//! separate signing crate, so SPEC_FULL.md §7 pins down a concrete (and
//! explicitly non-cryptographic) derivation: a packet's `mid` is a SHA-256
//! digest of its chaining context, truncated to 20 bytes. This keeps the
//! "opaque 20-byte tag" contract from spec.md §1 while staying inside the
//! dependency stack this workspace already carries (`sha2`).

use sha2::{Digest, Sha256};

use crate::varint::{from_varint, to_varint};

/// Length of a packet's payload region, in bytes.
pub const PAYLOAD_LEN: usize = 48;
/// Length of a message-ID / blob signature, in bytes.
pub const MID_LEN: usize = 20;
/// Length of the demultiplexing field, in bytes.
pub const DMX_LEN: usize = 7;
/// Length of the authentication field, in bytes.
pub const AUTH_LEN: usize = 64;
/// Total length of a packet's wire representation (excludes the 8-byte
/// reserved frame prefix).
pub const WIRE_LEN: usize = DMX_LEN + 1 + PAYLOAD_LEN + AUTH_LEN;

/// The seven packet kinds defined by spec.md §3, plus an `Unknown` escape
/// hatch for forward compatibility (spec.md §7: older readers must not
/// choke on newer kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Opaque 48-byte data.
    Plain48,
    /// Blob-chain head: `varint(size) ‖ head-bytes ‖ 20B pointer`.
    Chain20,
    /// Declares this feed a child of another (payload[..32] = parent fid).
    IsChild,
    /// Declares this feed a continuation of another (payload[..32] = predecessor fid).
    IsContn,
    /// In-feed announcement of a child feed (payload[..32] = child fid).
    MkChild,
    /// Terminator; ends the feed (payload[..32] = continuation fid).
    ContDas,
    /// A kind byte this version of the codec does not recognize.
    Unknown(u8),
}

impl PacketKind {
    const PLAIN48: u8 = 0;
    const CHAIN20: u8 = 1;
    const ISCHILD: u8 = 2;
    const ISCONTN: u8 = 3;
    const MKCHILD: u8 = 4;
    const CONTDAS: u8 = 5;

    /// The single-byte tag stored at offset 7 of a packet's wire form.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Plain48 => Self::PLAIN48,
            Self::Chain20 => Self::CHAIN20,
            Self::IsChild => Self::ISCHILD,
            Self::IsContn => Self::ISCONTN,
            Self::MkChild => Self::MKCHILD,
            Self::ContDas => Self::CONTDAS,
            Self::Unknown(b) => b,
        }
    }

    /// Parses a kind byte, mapping anything unrecognized to `Unknown`.
    #[must_use]
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            Self::PLAIN48 => Self::Plain48,
            Self::CHAIN20 => Self::Chain20,
            Self::ISCHILD => Self::IsChild,
            Self::ISCONTN => Self::IsContn,
            Self::MKCHILD => Self::MkChild,
            Self::CONTDAS => Self::ContDas,
            other => Self::Unknown(other),
        }
    }
}

/// A parsed or freshly-constructed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: PacketKind,
    payload: [u8; PAYLOAD_LEN],
    mid: [u8; MID_LEN],
    dmx: [u8; DMX_LEN],
}

impl Packet {
    /// Constructs a `plain48` packet at `(fid, seq, prev_mid)` carrying
    /// `payload` verbatim.
    #[must_use]
    pub fn new(fid: &[u8; 32], seq_be4: [u8; 4], prev_mid: &[u8; MID_LEN], payload: [u8; PAYLOAD_LEN]) -> Self {
        build(fid, seq_be4, prev_mid, PacketKind::Plain48, payload)
    }

    /// Constructs a packet of any kind at `(fid, seq, prev_mid)`, for the
    /// topology-declaring kinds (`ischild`, `iscontn`, `mkchild`, `contdas`)
    /// whose payload carries a target feed id rather than opaque data.
    #[must_use]
    pub fn new_kind(fid: &[u8; 32], seq_be4: [u8; 4], prev_mid: &[u8; MID_LEN], kind: PacketKind, payload: [u8; PAYLOAD_LEN]) -> Self {
        build(fid, seq_be4, prev_mid, kind, payload)
    }

    /// Constructs an `ischild`/`iscontn`/`mkchild`/`contdas` packet whose
    /// payload is `target_fid` left-padded into the 48-byte payload with
    /// trailing zeros, as spec.md §3 describes for these kinds.
    #[must_use]
    pub fn new_targeting(fid: &[u8; 32], seq_be4: [u8; 4], prev_mid: &[u8; MID_LEN], kind: PacketKind, target_fid: [u8; 32]) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[..32].copy_from_slice(&target_fid);
        build(fid, seq_be4, prev_mid, kind, payload)
    }

    /// This packet's kind.
    #[must_use]
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// The raw 48-byte payload.
    #[must_use]
    pub fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }

    /// This packet's message-ID, chaining it to the next packet in the feed.
    #[must_use]
    pub fn mid(&self) -> [u8; MID_LEN] {
        self.mid
    }

    /// The demultiplexing field derived from this packet's chaining context.
    #[must_use]
    pub fn dmx(&self) -> [u8; DMX_LEN] {
        self.dmx
    }

    /// For `ischild`/`iscontn`/`mkchild`/`contdas`, the 32-byte target feed
    /// id carried in the first 32 bytes of the payload. `None` for any
    /// other kind.
    #[must_use]
    pub fn target_fid(&self) -> Option<[u8; 32]> {
        match self.kind {
            PacketKind::IsChild | PacketKind::IsContn | PacketKind::MkChild | PacketKind::ContDas => {
                let mut fid = [0u8; 32];
                fid.copy_from_slice(&self.payload[..32]);
                Some(fid)
            }
            _ => None,
        }
    }

    /// For `chain20`, decodes the size prefix, inline head bytes, and
    /// pointer to the first blob. `None` for any other kind or if the
    /// varint prefix is malformed.
    #[must_use]
    pub fn chain_head(&self) -> Option<ChainHead> {
        if self.kind != PacketKind::Chain20 {
            return None;
        }
        let (size, varint_len) = from_varint(&self.payload).ok()?;
        if varint_len > 28 {
            return None;
        }
        let head_bytes = self.payload[varint_len..28].to_vec();
        let mut ptr = [0u8; MID_LEN];
        ptr.copy_from_slice(&self.payload[28..48]);
        Some(ChainHead { size: size.min(u64::from(u32::MAX)) as u32, head_bytes, ptr })
    }

    /// Serializes this packet to its 120-byte wire form
    /// (`dmx ‖ kind ‖ payload ‖ auth`).
    #[must_use]
    pub fn wire(&self) -> [u8; WIRE_LEN] {
        let mut out = [0u8; WIRE_LEN];
        out[..DMX_LEN].copy_from_slice(&self.dmx);
        out[DMX_LEN] = self.kind.tag();
        out[DMX_LEN + 1..DMX_LEN + 1 + PAYLOAD_LEN].copy_from_slice(&self.payload);
        out[DMX_LEN + 1 + PAYLOAD_LEN..].copy_from_slice(&auth_field(&self.mid));
        out
    }
}

/// Decoded view of a `chain20` packet's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHead {
    /// Total logical byte length of the chained content.
    pub size: u32,
    /// Content bytes stored inline in the head packet.
    pub head_bytes: Vec<u8>,
    /// Pointer (signature) of the first blob, or all-zero if none.
    pub ptr: [u8; MID_LEN],
}

/// A 120-byte sidecar blob frame: `100B payload ‖ 20B next-pointer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Content-bearing bytes.
    pub payload: [u8; 100],
    /// Pointer (signature) of the next blob, or all-zero to terminate.
    pub next: [u8; MID_LEN],
}

impl Blob {
    /// Content-addressed signature for this blob: the 20-byte tag other
    /// packets/blobs use to reference it (spec.md §3: "Addressed by
    /// signature (20B) matching the pointer held by the referring
    /// packet/blob").
    #[must_use]
    pub fn signature(&self) -> [u8; MID_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(self.payload);
        hasher.update(self.next);
        let digest = hasher.finalize();
        let mut sig = [0u8; MID_LEN];
        sig.copy_from_slice(&digest[..MID_LEN]);
        sig
    }

    /// Serializes to the 120-byte on-disk form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 120] {
        let mut out = [0u8; 120];
        out[..100].copy_from_slice(&self.payload);
        out[100..].copy_from_slice(&self.next);
        out
    }

    /// Parses from exactly 120 bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 120]) -> Self {
        let mut payload = [0u8; 100];
        payload.copy_from_slice(&bytes[..100]);
        let mut next = [0u8; MID_LEN];
        next.copy_from_slice(&bytes[100..]);
        Self { payload, next }
    }
}

/// Parses a packet from its 120-byte wire form under the given chaining
/// context. Construction is infallible: this workspace's integrity check
/// is the header rebuild in `Feed::open` (re-deriving every `mid` from
/// scratch and comparing the result to the stored `front_mid`), not a
/// per-packet signature check — see SPEC_FULL.md §7.
#[must_use]
pub fn pkt_from_bytes(fid: &[u8; 32], seq_be4: [u8; 4], prev_mid: &[u8; MID_LEN], raw: &[u8; WIRE_LEN]) -> Packet {
    let kind = PacketKind::from_tag(raw[DMX_LEN]);
    let mut payload = [0u8; PAYLOAD_LEN];
    payload.copy_from_slice(&raw[DMX_LEN + 1..DMX_LEN + 1 + PAYLOAD_LEN]);
    build(fid, seq_be4, prev_mid, kind, payload)
}

/// Constructs a `chain20` head packet and the tail blobs needed to carry an
/// oversize payload, per spec.md §4.3/§4.3.2.
#[must_use]
pub fn create_chain(fid: &[u8; 32], seq_be4: [u8; 4], prev_mid: &[u8; MID_LEN], payload: &[u8]) -> (Packet, Vec<Blob>) {
    let size = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let size_varint = to_varint(u64::from(size));
    let varint_len = size_varint.len().min(28);
    let head_capacity = 28 - varint_len;

    let (head_content, rest) = if payload.len() <= head_capacity {
        (payload, &payload[payload.len()..])
    } else {
        payload.split_at(head_capacity)
    };

    let mut blobs = Vec::new();
    let mut next_ptr = [0u8; MID_LEN];
    for chunk in rest.chunks(100).rev() {
        let mut chunk_payload = [0u8; 100];
        chunk_payload[..chunk.len()].copy_from_slice(chunk);
        let blob = Blob { payload: chunk_payload, next: next_ptr };
        next_ptr = blob.signature();
        blobs.push(blob);
    }
    blobs.reverse();

    let head_ptr = if blobs.is_empty() { [0u8; MID_LEN] } else { blobs[0].signature() };

    let mut head_payload = [0u8; PAYLOAD_LEN];
    head_payload[..varint_len].copy_from_slice(&size_varint[..varint_len]);
    head_payload[varint_len..varint_len + head_content.len()].copy_from_slice(head_content);
    head_payload[28..48].copy_from_slice(&head_ptr);

    (build(fid, seq_be4, prev_mid, PacketKind::Chain20, head_payload), blobs)
}

fn build(fid: &[u8; 32], seq_be4: [u8; 4], prev_mid: &[u8; MID_LEN], kind: PacketKind, payload: [u8; PAYLOAD_LEN]) -> Packet {
    let mut mid_hasher = Sha256::new();
    mid_hasher.update(fid);
    mid_hasher.update(seq_be4);
    mid_hasher.update(prev_mid);
    mid_hasher.update([kind.tag()]);
    mid_hasher.update(payload);
    let mid_digest = mid_hasher.finalize();
    let mut mid = [0u8; MID_LEN];
    mid.copy_from_slice(&mid_digest[..MID_LEN]);

    let mut dmx_hasher = Sha256::new();
    dmx_hasher.update(fid);
    dmx_hasher.update(seq_be4);
    dmx_hasher.update(prev_mid);
    let dmx_digest = dmx_hasher.finalize();
    let mut dmx = [0u8; DMX_LEN];
    dmx.copy_from_slice(&dmx_digest[..DMX_LEN]);

    Packet { kind, payload, mid, dmx }
}

/// Deterministic 64-byte filler for the wire format's reserved auth field.
/// Not a cryptographic signature (see SPEC_FULL.md §7) — just a value
/// derived from `mid` so `wire()`/`pkt_from_bytes` round-trip stably.
fn auth_field(mid: &[u8; MID_LEN]) -> [u8; AUTH_LEN] {
    let mut first = Sha256::new();
    first.update(mid);
    let first_half = first.finalize();
    let mut second = Sha256::new();
    second.update(first_half);
    let second_half = second.finalize();

    let mut out = [0u8; AUTH_LEN];
    out[..32].copy_from_slice(&first_half);
    out[32..].copy_from_slice(&second_half);
    out
}
