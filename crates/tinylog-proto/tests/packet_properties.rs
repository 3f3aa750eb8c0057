//! Property tests for packet wire round-tripping (spec.md §8, invariant 2/3).

use proptest::collection::vec;
use proptest::prelude::*;
use tinylog_proto::{Packet, pkt_from_bytes};

fn array32() -> impl Strategy<Value = [u8; 32]> {
    vec(any::<u8>(), 32).prop_map(|v| v.try_into().expect("len 32"))
}

fn array20() -> impl Strategy<Value = [u8; 20]> {
    vec(any::<u8>(), 20).prop_map(|v| v.try_into().expect("len 20"))
}

fn array48() -> impl Strategy<Value = [u8; 48]> {
    vec(any::<u8>(), 48).prop_map(|v| v.try_into().expect("len 48"))
}

proptest! {
    #[test]
    fn plain48_wire_round_trips(
        fid in array32(),
        seq in any::<u32>(),
        prev_mid in array20(),
        payload in array48(),
    ) {
        let seq_be4 = seq.to_be_bytes();
        let pkt = Packet::new(&fid, seq_be4, &prev_mid, payload);
        let wire = pkt.wire();
        let parsed = pkt_from_bytes(&fid, seq_be4, &prev_mid, &wire);
        prop_assert_eq!(parsed, pkt);
    }

    #[test]
    fn different_payloads_never_collide_on_mid(
        fid in array32(),
        seq in any::<u32>(),
        prev_mid in array20(),
        a in array48(),
        b in array48(),
    ) {
        prop_assume!(a != b);
        let seq_be4 = seq.to_be_bytes();
        let pa = Packet::new(&fid, seq_be4, &prev_mid, a);
        let pb = Packet::new(&fid, seq_be4, &prev_mid, b);
        prop_assert_ne!(pa.mid(), pb.mid());
    }
}
