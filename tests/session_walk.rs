//! GetBulkWalk behavior against a scripted v2c agent.

mod common;

use bytes::Bytes;
use snmp_session::message::CommunityMessage;
use snmp_session::transport::{MockReply, MockTransport};
use snmp_session::{
    ErrorStatus, Oid, PduType, Session, SessionConfig, Value, Version, oid,
};

use common::{MemoryMib, v2c_agent};

fn v2c_config() -> SessionConfig {
    let mut config = SessionConfig::new(Version::V2c, "127.0.0.1:161");
    config.community = "public".into();
    config
}

async fn v2c_session(mib: MemoryMib) -> Session<MockTransport> {
    Session::with_transport(v2c_config(), MockTransport::new(v2c_agent(mib, "public")))
        .await
        .expect("session")
}

/// A larger table fixture: 12 rows under 1.3.6.1.2.1.1.
fn wide_mib() -> MemoryMib {
    let mut entries = Vec::new();
    for row in 1..=12u32 {
        entries.push((
            Oid::new([1, 3, 6, 1, 2, 1, 1, row, 0]),
            Value::Integer(row as i32),
        ));
    }
    // an entry past the walked subtree
    entries.push((oid!(1, 3, 6, 1, 2, 1, 7, 1, 0), Value::Integer(99)));
    MemoryMib::new(entries)
}

fn assert_strictly_increasing(varbinds: &[snmp_session::VarBind]) {
    for pair in varbinds.windows(2) {
        assert!(
            pair[0].oid < pair[1].oid,
            "walk result not strictly increasing: {} >= {}",
            pair[0].oid,
            pair[1].oid
        );
    }
}

#[tokio::test]
async fn s2_single_root_walk_collects_subtree_once() {
    let mut session = v2c_session(wide_mib()).await;

    let root = oid!(1, 3, 6, 1, 2, 1, 1);
    let result = session.get_bulk_walk(&[root.clone()], 0, 3).await.unwrap();

    assert_eq!(result.pdu_type, PduType::Response);
    assert_eq!(result.error_status_enum(), ErrorStatus::NoError);
    // all 12 rows, nothing from outside the subtree, no sentinel leaked
    assert_eq!(result.varbinds.len(), 12);
    for vb in &result.varbinds {
        assert!(vb.oid.is_descendant_of(&root), "{} escaped the root", vb.oid);
        assert!(!vb.value.is_exception());
    }
    assert_strictly_increasing(&result.varbinds);
}

#[tokio::test]
async fn walk_with_large_max_repetitions_finishes_in_one_pass() {
    let mut session = v2c_session(wide_mib()).await;

    let result = session
        .get_bulk_walk(&[oid!(1, 3, 6, 1, 2, 1, 1)], 0, 50)
        .await
        .unwrap();
    assert_eq!(result.varbinds.len(), 12);
    assert_strictly_increasing(&result.varbinds);
}

#[tokio::test]
async fn multi_root_walk_reduces_overlapping_roots() {
    let mut session = v2c_session(MemoryMib::system_group()).await;

    // the second root is inside the first; results must not double up
    let result = session
        .get_bulk_walk(
            &[oid!(1, 3, 6, 1, 2, 1), oid!(1, 3, 6, 1, 2, 1, 1)],
            0,
            3,
        )
        .await
        .unwrap();

    assert_eq!(result.varbinds.len(), 7); // every system_group entry once
    assert_strictly_increasing(&result.varbinds);

    let mut seen = std::collections::HashSet::new();
    for vb in &result.varbinds {
        assert!(seen.insert(vb.oid.clone()), "duplicate OID {}", vb.oid);
    }
}

#[tokio::test]
async fn multi_root_walk_disjoint_subtrees() {
    let mut session = v2c_session(MemoryMib::system_group()).await;

    let system = oid!(1, 3, 6, 1, 2, 1, 1);
    let interfaces = oid!(1, 3, 6, 1, 2, 1, 2);
    let result = session
        .get_bulk_walk(&[interfaces.clone(), system.clone()], 0, 2)
        .await
        .unwrap();

    assert_eq!(result.varbinds.len(), 7);
    assert_strictly_increasing(&result.varbinds);
    for vb in &result.varbinds {
        assert!(vb.oid.is_descendant_of(&system) || vb.oid.is_descendant_of(&interfaces));
    }
}

#[tokio::test]
async fn walk_input_slice_is_not_mutated() {
    let mut session = v2c_session(MemoryMib::system_group()).await;

    let roots = vec![oid!(1, 3, 6, 1, 2, 1, 2), oid!(1, 3, 6, 1, 2, 1, 1)];
    let before = roots.clone();
    session.get_bulk_walk(&roots, 0, 3).await.unwrap();
    assert_eq!(roots, before);
}

#[tokio::test]
async fn walk_with_non_repeaters_collects_them_once() {
    let mut session = v2c_session(MemoryMib::system_group()).await;

    // first OID is a non-repeater: one GETNEXT result, collected verbatim
    let result = session
        .get_bulk_walk(
            &[oid!(1, 3, 6, 1, 2, 1, 1, 1), oid!(1, 3, 6, 1, 2, 1, 2)],
            1,
            3,
        )
        .await
        .unwrap();

    // the non-repeater result leads the varbind list
    assert_eq!(result.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
    assert_eq!(result.varbinds[0].value, Value::from("linux"));

    // the rest is the interfaces subtree, each entry once
    let interfaces = oid!(1, 3, 6, 1, 2, 1, 2);
    let rest = &result.varbinds[1..];
    assert_eq!(rest.len(), 4);
    for vb in rest {
        assert!(vb.oid.is_descendant_of(&interfaces));
    }
}

#[tokio::test]
async fn s5_non_repeater_error_is_returned_verbatim() {
    // agent always answers noSuchName at index 1
    let handler = |datagram: &[u8]| {
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(datagram)).unwrap();
        let mut response = msg.pdu.clone();
        response.pdu_type = PduType::Response;
        response.error_status = ErrorStatus::NoSuchName.as_i32();
        response.error_index = 1;
        MockReply::Data(
            CommunityMessage::new(Version::V2c, Bytes::from_static(b"public"), response)
                .encode()
                .to_vec(),
        )
    };

    let mut session = Session::with_transport(v2c_config(), MockTransport::new(handler))
        .await
        .unwrap();

    let result = session
        .get_bulk_walk(
            &[oid!(1, 3, 6, 1, 1), oid!(1, 3, 6, 1, 2), oid!(1, 3, 6, 1, 3)],
            1,
            5,
        )
        .await
        .unwrap();

    // error-index 1 <= nonRepeaters 1: the response surfaces unchanged
    assert_eq!(result.error_status_enum(), ErrorStatus::NoSuchName);
    assert_eq!(result.error_index, 1);
    assert_eq!(result.varbinds.len(), 3);
}

#[tokio::test]
async fn walk_surfaces_hard_errors_verbatim() {
    let handler = |datagram: &[u8]| {
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(datagram)).unwrap();
        let mut response = msg.pdu.clone();
        response.pdu_type = PduType::Response;
        response.error_status = ErrorStatus::GenErr.as_i32();
        response.error_index = 0;
        MockReply::Data(
            CommunityMessage::new(Version::V2c, Bytes::from_static(b"public"), response)
                .encode()
                .to_vec(),
        )
    };

    let mut session = Session::with_transport(v2c_config(), MockTransport::new(handler))
        .await
        .unwrap();

    let result = session
        .get_bulk_walk(&[oid!(1, 3, 6, 1)], 0, 5)
        .await
        .unwrap();
    assert_eq!(result.error_status_enum(), ErrorStatus::GenErr);
}

#[tokio::test]
async fn walk_of_empty_subtree_returns_empty_response() {
    let mut session = v2c_session(MemoryMib::system_group()).await;

    // nothing lives under this root
    let result = session
        .get_bulk_walk(&[oid!(1, 3, 6, 1, 4, 1, 9999)], 0, 5)
        .await
        .unwrap();

    assert_eq!(result.pdu_type, PduType::Response);
    assert!(result.varbinds.is_empty());
}

#[tokio::test]
async fn walk_terminates_at_end_of_mib() {
    // root covering the tail of the MIB: agent ends with endOfMibView
    let mut session = v2c_session(MemoryMib::system_group()).await;

    let root = oid!(1, 3, 6, 1, 2, 1, 2);
    let result = session.get_bulk_walk(&[root.clone()], 0, 3).await.unwrap();

    assert_eq!(result.varbinds.len(), 4);
    for vb in &result.varbinds {
        assert!(vb.oid.is_descendant_of(&root));
        assert!(!vb.value.is_exception());
    }
}

#[tokio::test]
async fn walk_rejects_more_non_repeaters_than_oids() {
    let mut session = v2c_session(MemoryMib::system_group()).await;
    let err = session
        .get_bulk_walk(&[oid!(1, 3, 6)], 2, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, snmp_session::Error::Argument { .. }));
}

#[tokio::test]
async fn plain_get_bulk_returns_interleaved_rows() {
    let mut session = v2c_session(MemoryMib::system_group()).await;

    let result = session
        .get_bulk(
            &[oid!(1, 3, 6, 1, 2, 1, 1, 3), oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1)],
            1,
            2,
        )
        .await
        .unwrap();

    // 1 non-repeater + 2 repetitions of 1 repeater
    assert_eq!(result.varbinds.len(), 3);
    assert_eq!(result.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 3, 0));
    assert_eq!(
        result.varbinds[1].oid,
        oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 1)
    );
    assert_eq!(
        result.varbinds[2].oid,
        oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 2)
    );
}
