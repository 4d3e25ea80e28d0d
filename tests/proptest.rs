//! Property tests for the BER codec and the varbind-list laws.

use bytes::Bytes;
use proptest::prelude::*;

use snmp_session::ber::{Decoder, EncodeBuf};
use snmp_session::oid::Oid;
use snmp_session::value::Value;
use snmp_session::varbind::{
    VarBind, decode_varbind_list, encode_varbind_list, sort_and_dedup,
};

fn arb_oid() -> impl Strategy<Value = Oid> {
    // valid first/second arcs plus a modest tail
    (0u32..3, 0u32..40, prop::collection::vec(0u32..100_000, 0..10)).prop_map(
        |(arc1, arc2, rest)| {
            let mut arcs = vec![arc1, arc2];
            arcs.extend(rest);
            Oid::from_slice(&arcs)
        },
    )
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::Integer),
        prop::collection::vec(any::<u8>(), 0..256).prop_map(|v| Value::OctetString(Bytes::from(v))),
        Just(Value::Null),
        arb_oid().prop_map(Value::ObjectIdentifier),
        any::<[u8; 4]>().prop_map(Value::IpAddress),
        any::<u32>().prop_map(Value::Counter32),
        any::<u32>().prop_map(Value::Gauge32),
        any::<u32>().prop_map(Value::TimeTicks),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(|v| Value::Opaque(Bytes::from(v))),
        any::<u64>().prop_map(Value::Counter64),
        Just(Value::NoSuchObject),
        Just(Value::NoSuchInstance),
        Just(Value::EndOfMibView),
    ]
}

proptest! {
    /// decode(encode(v)) == v for every well-formed value.
    #[test]
    fn value_roundtrip(value in arb_value()) {
        let mut buf = EncodeBuf::new();
        value.encode(&mut buf);
        let mut decoder = Decoder::new(buf.finish());
        let decoded = Value::decode(&mut decoder).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert!(decoder.is_empty(), "trailing bytes after decode");
    }

    #[test]
    fn oid_ber_roundtrip(oid in arb_oid()) {
        let decoded = Oid::from_ber(&oid.to_ber()).unwrap();
        prop_assert_eq!(decoded, oid);
    }

    #[test]
    fn oid_text_roundtrip(oid in arb_oid()) {
        let parsed: Oid = oid.to_string().parse().unwrap();
        prop_assert_eq!(parsed, oid);
    }

    #[test]
    fn varbind_list_roundtrip(
        binds in prop::collection::vec((arb_oid(), arb_value()), 0..16)
    ) {
        let varbinds: Vec<VarBind> = binds
            .into_iter()
            .map(|(oid, value)| VarBind::new(oid, value))
            .collect();

        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, &varbinds);
        let mut decoder = Decoder::new(buf.finish());
        let decoded = decode_varbind_list(&mut decoder).unwrap();
        prop_assert_eq!(decoded, varbinds);
    }

    /// sort_and_dedup yields strictly increasing OIDs and is idempotent.
    #[test]
    fn sort_and_dedup_laws(
        binds in prop::collection::vec((arb_oid(), arb_value()), 0..32)
    ) {
        let varbinds: Vec<VarBind> = binds
            .into_iter()
            .map(|(oid, value)| VarBind::new(oid, value))
            .collect();

        let sorted = sort_and_dedup(varbinds);
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].oid < pair[1].oid);
        }
        prop_assert_eq!(sort_and_dedup(sorted.clone()), sorted);
    }
}
