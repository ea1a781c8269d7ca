use super::*;
use crate::addr::LcafAddr;
use std::net::{Ipv4Addr, Ipv6Addr};

fn v4_eid(addr: [u8; 4], mask: u8) -> Eid {
    Eid::from_ipv4_prefix(Ipv4Addr::from(addr), mask)
}

fn v4_rloc(addr: [u8; 4]) -> Rloc {
    Rloc(LispAddr::Ipv4(Ipv4Addr::from(addr)))
}

fn sample_record() -> MappingRecord {
    let mut record = MappingRecord::new(
        v4_eid([10, 1, 0, 0], 16),
        1440,
        vec![
            LocatorRecord::new(v4_rloc([192, 0, 2, 1]), 1, 100),
            LocatorRecord::new(v4_rloc([192, 0, 2, 2]), 2, 50),
        ],
    );
    record.authoritative = true;
    record.map_version = 7;
    record
}

#[test]
fn register_roundtrip_with_xtr_site_id() {
    let register = MapRegister {
        proxy_map_reply: true,
        want_map_notify: true,
        merge_enabled: true,
        nonce: 0x1122_3344_5566_7788,
        key_id: 2,
        authentication_data: vec![0xab; 16],
        records: vec![sample_record()],
        xtr_id: Some(XtrId([0x11; 16])),
        site_id: Some(SiteId([0x22; 8])),
        source_rloc: None,
    };
    let wire = register.to_wire();
    let decoded = MapRegister::from_wire(wire).unwrap();

    assert!(decoded.proxy_map_reply);
    assert!(decoded.want_map_notify);
    assert!(decoded.merge_enabled);
    assert_eq!(decoded.nonce, register.nonce);
    assert_eq!(decoded.authentication_data, register.authentication_data);
    assert_eq!(decoded.xtr_id, register.xtr_id);
    assert_eq!(decoded.site_id, register.site_id);
    // the trailer identity is copied into each record on decode
    assert_eq!(decoded.records[0].xtr_id, register.xtr_id);
    assert_eq!(decoded.records[0].site_id, register.site_id);
    assert!(decoded.records[0].same_content(&register.records[0]));
}

#[test]
fn register_roundtrip_without_trailer() {
    let register = MapRegister {
        proxy_map_reply: false,
        want_map_notify: false,
        merge_enabled: false,
        nonce: 1,
        key_id: 2,
        authentication_data: vec![0; 16],
        records: vec![sample_record()],
        xtr_id: None,
        site_id: None,
        source_rloc: None,
    };
    let decoded = MapRegister::from_wire(register.to_wire()).unwrap();
    assert_eq!(decoded, register);
}

#[test]
fn register_wrong_type_rejected() {
    let reply = MapReply::new(9, vec![]);
    assert!(matches!(
        MapRegister::from_wire(reply.to_wire()),
        Err(Error::MalformedPacket(_))
    ));
}

#[test]
fn truncated_register_is_malformed() {
    let wire = MapRegister {
        proxy_map_reply: false,
        want_map_notify: true,
        merge_enabled: false,
        nonce: 2,
        key_id: 2,
        authentication_data: vec![0; 16],
        records: vec![sample_record()],
        xtr_id: None,
        site_id: None,
        source_rloc: None,
    }
    .to_wire();
    for cut in [0, 3, 12, 17, wire.len() - 1] {
        let result = MapRegister::from_wire(wire.slice(..cut));
        assert!(matches!(result, Err(Error::MalformedPacket(_))), "cut at {}", cut);
    }
}

#[test]
fn notify_roundtrip() {
    let notify = MapNotify {
        merge_enabled: true,
        nonce: 77,
        key_id: 2,
        authentication_data: vec![0xcd; 16],
        records: vec![sample_record()],
        xtr_id: Some(XtrId([9; 16])),
        site_id: Some(SiteId([8; 8])),
    };
    let decoded = MapNotify::from_wire(notify.to_wire()).unwrap();
    assert!(decoded.merge_enabled);
    assert_eq!(decoded.nonce, 77);
    assert_eq!(decoded.xtr_id, notify.xtr_id);
    assert_eq!(decoded.site_id, notify.site_id);
    assert!(decoded.records[0].same_content(&notify.records[0]));
}

#[test]
fn request_roundtrip() {
    let request = MapRequest {
        authoritative: true,
        map_data_present: false,
        probe: false,
        smr: true,
        pitr: true,
        smr_invoked: true,
        nonce: 0xdead_beef,
        // the source EID field carries no mask on the wire
        source_eid: Some(Eid::new(LispAddr::Ipv4(Ipv4Addr::new(10, 9, 0, 1)))),
        itr_rlocs: vec![v4_rloc([192, 0, 2, 7]), v4_rloc([198, 51, 100, 1])],
        eid_items: vec![v4_eid([10, 1, 2, 0], 24)],
        source_rloc: None,
    };
    let decoded = MapRequest::from_wire(request.to_wire()).unwrap();
    assert_eq!(decoded, request);
}

#[test]
fn request_without_source_eid() {
    let request = MapRequest::query(v4_eid([10, 0, 0, 1], 32), v4_rloc([192, 0, 2, 1]), 5);
    let decoded = MapRequest::from_wire(request.to_wire()).unwrap();
    assert!(decoded.source_eid.is_none());
    assert_eq!(decoded.itr_rlocs.len(), 1);
    assert_eq!(decoded.eid_items, request.eid_items);
}

#[test]
fn request_without_itr_rlocs_encodes_null_entry() {
    let mut request = MapRequest::query(v4_eid([10, 1, 2, 0], 24), v4_rloc([192, 0, 2, 7]), 9);
    request.itr_rlocs.clear();
    let decoded = MapRequest::from_wire(request.to_wire()).unwrap();
    assert_eq!(decoded.itr_rlocs, vec![Rloc(LispAddr::NoAddress)]);
    assert_eq!(decoded.eid_items, request.eid_items);
    assert_eq!(decoded.nonce, 9);
}

#[test]
fn unmasked_host_eid_encodes_full_mask() {
    // without an explicit mask the record must go out as a host route,
    // not as a /0 covering everything
    let record = MappingRecord::new(
        Eid::new(LispAddr::Ipv4(Ipv4Addr::new(10, 0, 0, 1))),
        60,
        vec![LocatorRecord::new(v4_rloc([192, 0, 2, 1]), 1, 1)],
    );
    let mut buf = BytesMut::new();
    record.encode(&mut buf);
    let decoded = MappingRecord::decode(&mut buf.freeze()).unwrap();
    assert_eq!(decoded.eid.mask, Some(32));
    assert_eq!(decoded.eid.addr, record.eid.addr);
}

#[test]
fn request_eid_with_vni_wraps_instance_id() {
    let eid = v4_eid([10, 0, 0, 0], 8).with_vni(1000);
    let request = MapRequest::query(eid.clone(), v4_rloc([192, 0, 2, 1]), 5);
    let decoded = MapRequest::from_wire(request.to_wire()).unwrap();
    assert_eq!(decoded.eid_items[0], eid);
}

#[test]
fn reply_roundtrip_with_negative_record() {
    let negative = MappingRecord::negative(
        v4_eid([10, 99, 0, 0], 16),
        900,
        MapReplyAction::NativelyForward,
    );
    let reply = MapReply::new(42, vec![sample_record(), negative.clone()]);
    let decoded = MapReply::from_wire(reply.to_wire()).unwrap();
    assert_eq!(decoded.nonce, 42);
    assert_eq!(decoded.records.len(), 2);
    assert!(decoded.records[1].is_negative());
    assert_eq!(decoded.records[1].action, MapReplyAction::NativelyForward);
    assert_eq!(decoded.records[1].ttl, 900);
}

#[test]
fn record_roundtrip_ipv6() {
    let eid = Eid::from_ipv6_prefix("2001:db8::".parse::<Ipv6Addr>().unwrap(), 48);
    let record = MappingRecord::new(
        eid,
        TTL_INDEFINITE,
        vec![LocatorRecord::new(v4_rloc([203, 0, 113, 1]), 10, 10)],
    );
    let mut buf = BytesMut::new();
    record.encode(&mut buf);
    let decoded = MappingRecord::decode(&mut buf.freeze()).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn record_roundtrip_source_dest() {
    let eid = Eid::from_ipv4_src_dst(
        Ipv4Addr::new(10, 1, 0, 0),
        16,
        Ipv4Addr::new(10, 2, 0, 0),
        16,
    );
    let record = MappingRecord::new(
        eid.clone(),
        60,
        vec![LocatorRecord::new(v4_rloc([192, 0, 2, 9]), 1, 1)],
    );
    let mut buf = BytesMut::new();
    record.encode(&mut buf);
    let decoded = MappingRecord::decode(&mut buf.freeze()).unwrap();
    assert_eq!(decoded.eid, eid);
    assert!(decoded.eid.mask.is_none());
}

#[test]
fn locator_flags_roundtrip() {
    let mut locator = LocatorRecord::new(v4_rloc([192, 0, 2, 1]), 1, 1);
    locator.local = true;
    locator.rloc_probed = true;
    locator.routed = false;
    let record = MappingRecord::new(v4_eid([10, 0, 0, 0], 8), 10, vec![locator.clone()]);
    let mut buf = BytesMut::new();
    record.encode(&mut buf);
    let decoded = MappingRecord::decode(&mut buf.freeze()).unwrap();
    assert_eq!(decoded.locators[0], locator);
}

#[test]
fn map_version_truncated_to_12_bits() {
    let mut record = sample_record();
    record.map_version = 0xffff;
    let mut buf = BytesMut::new();
    record.encode(&mut buf);
    let decoded = MappingRecord::decode(&mut buf.freeze()).unwrap();
    assert_eq!(decoded.map_version, 0x0fff);
}

#[test]
fn same_content_ignores_bookkeeping() {
    let mut a = sample_record();
    let mut b = sample_record();
    a.xtr_id = Some(XtrId([1; 16]));
    b.timestamp = Some(SystemTime::now());
    assert!(a.same_content(&b));
    b.ttl += 1;
    assert!(!a.same_content(&b));
}

#[test]
fn dispatch_by_type_code() {
    let request = MapRequest::query(v4_eid([10, 0, 0, 1], 32), v4_rloc([192, 0, 2, 1]), 3);
    match ControlMessage::decode(request.to_wire()).unwrap() {
        ControlMessage::Request(decoded) => assert_eq!(decoded.nonce, 3),
        other => panic!("wrong variant: {:?}", other),
    }

    let reply = MapReply::new(4, vec![]);
    assert!(matches!(
        ControlMessage::decode(reply.to_wire()).unwrap(),
        ControlMessage::Reply(_)
    ));
}

#[test]
fn dispatch_rejects_unknown_type() {
    let buf = Bytes::from_static(&[0xf0, 0, 0, 0]);
    assert!(matches!(
        ControlMessage::decode(buf),
        Err(Error::MalformedPacket(_))
    ));
    assert!(matches!(
        ControlMessage::decode(Bytes::new()),
        Err(Error::MalformedPacket(_))
    ));
}

#[test]
fn afi_list_rloc_in_locator() {
    let rloc = Rloc(LispAddr::Lcaf(LcafAddr::AfiList(vec![
        LispAddr::Ipv4(Ipv4Addr::new(192, 0, 2, 1)),
        LispAddr::Ipv6("2001:db8::1".parse().unwrap()),
    ])));
    let record = MappingRecord::new(
        v4_eid([10, 0, 0, 0], 8),
        30,
        vec![LocatorRecord::new(rloc.clone(), 1, 1)],
    );
    let mut buf = BytesMut::new();
    record.encode(&mut buf);
    let decoded = MappingRecord::decode(&mut buf.freeze()).unwrap();
    assert_eq!(decoded.locators[0].rloc, rloc);
}
